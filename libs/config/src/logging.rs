//! Tracing subscriber setup

use crate::settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the configured
/// level. Returns `false` if a subscriber was already installed.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}
