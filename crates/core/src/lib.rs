//! Core errors, constants and time primitives shared by the shuto crates.
//!
//! ## Key Components
//!
//! - **`errors`**: the shared `Error` enum and `Result` alias used by the
//!   configuration layer and binaries.
//! - **`clock`**: the injectable wall clock consumed by the URL signer and
//!   the metadata cache.
//! - **`constants`**: wire parameter names, environment variable names and
//!   defaults.

pub mod clock;
pub mod constants;
pub mod errors;

pub use self::{
    clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock},
    constants::*,
    errors::{Error, Result},
};
