use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::PairQuestError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. With `json` the
/// output is one JSON object per line, otherwise human-readable.
///
/// # Errors
/// Returns [`PairQuestError::Logging`] if a global subscriber is already
/// installed.
pub fn init_logging(level: &str, json: bool) -> Result<(), PairQuestError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_target(true))
            .try_init()?;
    }

    tracing::info!(%level, json, "logging initialised");
    Ok(())
}
