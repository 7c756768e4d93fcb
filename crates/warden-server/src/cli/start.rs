use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Parse arguments, initialize logging and resolve the action to run.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized or the arguments do
/// not form a usable configuration.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>("verbosity").copied().unwrap_or(0);
    telemetry::init(verbosity)?;

    dispatch::handler(&matches)
}
