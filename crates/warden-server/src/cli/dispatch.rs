use crate::cli::actions::Action;
use crate::config::ServerConfig;
use anyhow::Result;

/// Map parsed arguments to an [`Action`]. No subcommand means `serve`.
///
/// # Errors
///
/// Returns an error if the configuration is unusable, for example when
/// no signing secret is available.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = ServerConfig::load(matches)?;

    match matches.subcommand() {
        Some(("bootstrap", sub)) => Ok(Action::Bootstrap {
            config,
            force_password: sub.get_flag("force-password"),
        }),
        _ => Ok(Action::Serve(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn defaults_to_serve() {
        let action = dispatch(&["warden", "--jwt-secret", "s"]).unwrap();
        assert!(matches!(action, Action::Serve(_)));
    }

    #[test]
    fn bootstrap_reads_force_flag() {
        let action =
            dispatch(&["warden", "bootstrap", "--force-password", "--jwt-secret", "s"]).unwrap();
        assert!(matches!(
            action,
            Action::Bootstrap {
                force_password: true,
                ..
            }
        ));
    }

    #[test]
    fn missing_secret_fails_before_running() {
        assert!(dispatch(&["warden", "serve"]).is_err());
    }
}
