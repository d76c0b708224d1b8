use shuto_core::LOG_LEVEL_VAR;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Load `.env`, then install the stderr subscriber filtered by `LOG_LEVEL`.
///
/// `.env` is read first so it can set the level.
pub fn init() -> anyhow::Result<()> {
    let env_file = dotenv::dotenv();
    install(env_filter()?)?;
    log_env_file(env_file);
    Ok(())
}

/// Filter from `LOG_LEVEL`, falling back to `info`
pub fn env_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_from_env(LOG_LEVEL_VAR).or_else(|_| EnvFilter::try_new(DEFAULT_LEVEL))?)
}

fn install(filter: EnvFilter) -> anyhow::Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn log_env_file(env_file: dotenv::Result<PathBuf>) {
    match env_file {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }
}
