use super::{KeyArgs, WindowArgs};
use anyhow::anyhow;
use clap::Args;
use serde::Serialize;
use shuto_core::{API_VERSION, KEY_ID_PARAM};
use shuto_security::{Endpoint, UrlSigner};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed URL, either absolute or starting at `/v2/`
    pub url: String,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub keys: KeyArgs,
}

/// Outcome of checking one URL
#[derive(Debug, Serialize)]
pub struct Verification {
    pub endpoint: String,
    pub path: String,
    pub key_id: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerifyArgs {
    pub fn execute(self, json: bool, env_secret: Option<String>) -> anyhow::Result<ExitCode> {
        let signer = self.keys.signer(&self.window, env_secret)?;
        let verification = self.verify_with(&signer)?;

        if verification.valid {
            info!(path = %verification.path, "Signed URL accepted");
        } else {
            warn!(path = %verification.path, reason = ?verification.reason, "Signed URL rejected");
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&verification)?);
        } else if let Some(reason) = &verification.reason {
            println!("rejected: {reason}");
        } else {
            println!("valid");
        }

        Ok(if verification.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    pub fn verify_with(&self, signer: &UrlSigner) -> anyhow::Result<Verification> {
        let (endpoint, path, params) = Endpoint::parse_url(&self.url).ok_or_else(|| {
            anyhow!(
                "'{}' is not a /{API_VERSION}/image or /{API_VERSION}/download URL",
                self.url
            )
        })?;

        let outcome = signer.validate(&path, &params);

        Ok(Verification {
            endpoint: endpoint.to_string(),
            key_id: params.get(KEY_ID_PARAM).map(str::to_string),
            path,
            valid: outcome.is_ok(),
            reason: outcome.err().map(|e| e.to_string()),
        })
    }
}
