//! Log subscriber setup

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

/// `RUST_LOG` when set, else the level implied by the verbosity flags
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber, writing to stderr.
///
/// A second call is a no-op.
pub fn init_logging(config: &CliConfig) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.color.should_color())
                .with_target(false),
        )
        .try_init();
}
