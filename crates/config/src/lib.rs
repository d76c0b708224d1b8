//! Per-domain configuration for shuto
//!
//! Each tenant domain carries its storage remote and the signing keys used to
//! authorize requests against it.

pub mod domain;
pub mod loader;

pub use domain::*;
pub use loader::*;
