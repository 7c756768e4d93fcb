//! JSON logging.

use std::env::var;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Directive for the crate's own targets at a given `-v` count.
#[must_use]
pub const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warden=info",
        1 => "warden=debug",
        _ => "warden=trace",
    }
}

/// Install the global JSON subscriber.
///
/// Without `-v`, `RUST_LOG` is honored when set. An explicit `-v` wins.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` is malformed or a subscriber is
/// already installed.
pub fn init(verbosity: u8) -> Result<()> {
    let filter = match (verbosity, var(EnvFilter::DEFAULT_ENV)) {
        (0, Ok(_)) => EnvFilter::try_from_default_env()?,
        _ => EnvFilter::new(default_directive(verbosity)),
    }
    .add_directive("hyper=error".parse()?)
    .add_directive("surrealdb=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
