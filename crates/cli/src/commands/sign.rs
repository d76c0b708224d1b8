use super::{KeyArgs, WindowArgs};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use shuto_core::TIMESTAMP_PARAM;
use shuto_security::{Endpoint, QueryParams, SigningMode, UrlSigner};
use std::process::ExitCode;
use tracing::info;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Path of the stored object, relative to the domain root
    pub path: String,

    /// Endpoint the URL targets (image or download)
    #[arg(long, default_value = "image")]
    pub endpoint: Endpoint,

    /// Width of the image
    #[arg(long = "w", value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Height of the image
    #[arg(long = "h", value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Fit mode (clip, scale, ...)
    #[arg(long)]
    pub fit: Option<String>,

    /// Output format
    #[arg(long = "fm", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Quality (1-100)
    #[arg(long = "q", value_name = "QUALITY")]
    pub quality: Option<u32>,

    /// Device pixel ratio
    #[arg(long)]
    pub dpr: Option<f64>,

    /// Blur amount
    #[arg(long)]
    pub blur: Option<u32>,

    /// Force download
    #[arg(long = "dl")]
    pub download: bool,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub keys: KeyArgs,
}

/// A freshly minted URL
#[derive(Debug, Serialize)]
pub struct SignedUrl {
    pub endpoint: String,
    pub url: String,
    /// `None` for timeless URLs
    pub expires_at: Option<DateTime<Utc>>,
}

impl SignArgs {
    pub fn execute(self, json: bool, env_secret: Option<String>) -> anyhow::Result<ExitCode> {
        let signer = self.keys.signer(&self.window, env_secret)?;
        let signed = self.sign_with(&signer);

        info!(endpoint = %signed.endpoint, path = %self.path, "Generated signed URL");

        if json {
            println!("{}", serde_json::to_string_pretty(&signed)?);
            return Ok(ExitCode::SUCCESS);
        }

        let mut title = signed.endpoint.clone();
        if let Some(first) = title.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        println!("\nSigned {title} URL:\n{}", signed.url);
        match (signer.mode(), signed.expires_at) {
            (SigningMode::TimeBound { window_secs }, Some(at)) => {
                println!("\nThis URL will expire in {} minutes ({at})", window_secs / 60)
            }
            _ => println!("\nThis is a permanent URL (will not expire)"),
        }
        Ok(ExitCode::SUCCESS)
    }

    /// Transformation parameters carried by the URL
    pub fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(width) = self.width.filter(|w| *w > 0) {
            params.set("w", width.to_string());
        }
        if let Some(height) = self.height.filter(|h| *h > 0) {
            params.set("h", height.to_string());
        }
        if let Some(fit) = self.fit.as_deref().filter(|f| !f.is_empty()) {
            params.set("fit", fit);
        }
        if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
            params.set("fm", format);
        }
        if let Some(quality) = self.quality.filter(|q| *q > 0) {
            params.set("q", quality.to_string());
        }
        if let Some(dpr) = self.dpr.filter(|d| *d > 0.0) {
            params.set("dpr", format!("{dpr:.2}"));
        }
        if let Some(blur) = self.blur.filter(|b| *b > 0) {
            params.set("blur", blur.to_string());
        }
        if self.download {
            params.set("dl", "1");
        }
        params
    }

    pub fn sign_with(&self, signer: &UrlSigner) -> SignedUrl {
        let path = self.path.trim_start_matches('/');
        let signed = signer.sign(path, &self.params());

        let expires_at = match signer.mode() {
            SigningMode::Timeless => None,
            SigningMode::TimeBound { window_secs } => signed
                .get(TIMESTAMP_PARAM)
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(|ts| ts.checked_add(i64::try_from(window_secs).ok()?))
                .and_then(|at| DateTime::from_timestamp(at, 0)),
        };

        SignedUrl {
            endpoint: self.endpoint.to_string(),
            url: self.endpoint.url(&format!("{path}?{}", signed.encode())),
            expires_at,
        }
    }
}
