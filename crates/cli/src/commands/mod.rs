use anyhow::{anyhow, Context};
use clap::{Args, Subcommand};
use shuto_config::{DomainConfigManager, DomainConfigProvider};
use shuto_core::{DEFAULT_DOMAIN, DEFAULT_KEY_ID, HMAC_SECRET_KEY_VAR};
use shuto_security::{SecretKey, UrlSigner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

pub mod sign;
pub mod verify;

use self::sign::SignArgs;
use self::verify::VerifyArgs;

/// Validity used for environment keys when neither flag is given
pub const DEFAULT_VALIDITY_MINUTES: u64 = 5;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a signed image or download URL
    Sign(SignArgs),

    /// Check a signed URL and report why it would be rejected
    Verify(VerifyArgs),
}

impl Commands {
    pub fn execute(self, json: bool) -> anyhow::Result<ExitCode> {
        let env_secret = std::env::var(HMAC_SECRET_KEY_VAR).ok();
        match self {
            Commands::Sign(args) => args.execute(json, env_secret),
            Commands::Verify(args) => args.execute(json, env_secret),
        }
    }
}

/// Where signing keys come from
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Domains configuration file; the `HMAC_SECRET_KEY` variable is used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Domain to take keys from when `--config` is given
    #[arg(long, default_value = DEFAULT_DOMAIN)]
    pub domain: String,
}

/// Signing mode overrides
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Generate URLs that never expire
    #[arg(long, conflicts_with = "validity")]
    pub timeless: bool,

    /// Validity period in minutes for time-bound URLs
    #[arg(long, value_name = "MINUTES")]
    pub validity: Option<u64>,
}

impl WindowArgs {
    /// Window in seconds requested on the command line, if any
    pub fn window_secs(&self) -> Option<u64> {
        if self.timeless {
            Some(0)
        } else {
            self.validity.map(|minutes| minutes.saturating_mul(60))
        }
    }
}

impl KeyArgs {
    /// Build a signer from the domains file or from `env_secret`.
    ///
    /// A domain's own validity window applies unless `window` overrides it.
    pub fn signer(
        &self,
        window: &WindowArgs,
        env_secret: Option<String>,
    ) -> anyhow::Result<UrlSigner> {
        if let Some(path) = &self.config {
            let manager = DomainConfigManager::from_file(path);
            let mut security = manager
                .domain_config(&self.domain)
                .with_context(|| format!("Failed to load domain '{}'", self.domain))?
                .security;
            if let Some(window_secs) = window.window_secs() {
                security.validity_window = window_secs;
            }
            debug!(domain = %self.domain, keys = security.secrets.len(), "Using domain keys");
            return UrlSigner::try_from(&security)
                .with_context(|| format!("Invalid security config for domain '{}'", self.domain));
        }

        let secret = env_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow!("{HMAC_SECRET_KEY_VAR} not set in environment"))?;
        let window_secs = window
            .window_secs()
            .unwrap_or(DEFAULT_VALIDITY_MINUTES * 60);

        UrlSigner::new(vec![SecretKey::new(DEFAULT_KEY_ID, secret)], window_secs, "")
            .context("Failed to create URL signer")
    }
}
