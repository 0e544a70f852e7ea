//! Tracing setup for checks binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "CHECKS_LOG";

/// Build the filter: `CHECKS_LOG`, then `RUST_LOG`, then `level`.
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Returns `false` when a subscriber was already installed; the existing
/// one is kept.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let text = (!json).then(|| fmt::layer().with_target(false));
    let json = json.then(|| fmt::layer().with_target(false).json());
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(text)
        .with(json)
        .try_init()
        .is_ok()
}
