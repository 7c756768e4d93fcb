//! Command-line definition. Every option can also be set through its
//! `WARDEN_*` environment variable.

use clap::{Arg, ArgAction, Command};

fn option(name: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).env(env).help(help).global(true)
}

fn secret(name: &'static str, env: &'static str, help: &'static str) -> Arg {
    option(name, env, help).hide_env_values(true)
}

#[must_use]
pub fn new() -> Command {
    Command::new("warden")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(
            Command::new("serve").about("Run migrations, bootstrap and serve HTTP (default)"),
        )
        .subcommand(
            Command::new("bootstrap")
                .about("Provision the root organization and administrator, then exit")
                .arg(
                    Arg::new("force-password")
                        .long("force-password")
                        .help("Rehash the administrator password even if it still matches")
                        .action(ArgAction::SetTrue),
                ),
        )
        .arg(
            option("listen", "WARDEN_LISTEN", "HTTP listen address")
                .default_value("0.0.0.0:8080")
                .value_parser(clap::value_parser!(std::net::SocketAddr)),
        )
        .arg(option("secrets-dir", "WARDEN_SECRETS_DIR", "Directory of secret override files"))
        .args(database_args())
        .args(auth_args())
        .args(bootstrap_args())
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Raise log verbosity (-v debug, -vv trace)")
                .global(true)
                .action(ArgAction::Count),
        )
}

fn database_args() -> Vec<Arg> {
    vec![
        option("db-url", "WARDEN_DB_URL", "SurrealDB WebSocket address"),
        option("db-namespace", "WARDEN_DB_NAMESPACE", "SurrealDB namespace"),
        option("db-database", "WARDEN_DB_DATABASE", "SurrealDB database"),
        option("db-username", "WARDEN_DB_USERNAME", "SurrealDB root username"),
        secret("db-password", "WARDEN_DB_PASSWORD", "SurrealDB root password"),
    ]
}

fn auth_args() -> Vec<Arg> {
    vec![
        secret("jwt-secret", "WARDEN_JWT_SECRET", "HMAC secret for signing tokens"),
        option("jwt-issuer", "WARDEN_JWT_ISSUER", "Token issuer"),
        option("jwt-audience", "WARDEN_JWT_AUDIENCE", "Token audience"),
        option(
            "access-token-lifetime",
            "WARDEN_ACCESS_TOKEN_LIFETIME",
            "Access token lifetime in seconds",
        )
        .value_parser(clap::value_parser!(u64)),
        option(
            "refresh-token-lifetime",
            "WARDEN_REFRESH_TOKEN_LIFETIME",
            "Refresh token lifetime in seconds",
        )
        .value_parser(clap::value_parser!(u64)),
        option(
            "max-login-attempts",
            "WARDEN_MAX_LOGIN_ATTEMPTS",
            "Failed attempts before lockout (0 disables)",
        )
        .value_parser(clap::value_parser!(u32)),
        option(
            "lockout-duration",
            "WARDEN_LOCKOUT_DURATION",
            "Lockout duration in seconds",
        )
        .value_parser(clap::value_parser!(u64)),
        option(
            "min-password-length",
            "WARDEN_MIN_PASSWORD_LENGTH",
            "Minimum password length",
        )
        .value_parser(clap::value_parser!(usize)),
        secret("password-pepper", "WARDEN_PASSWORD_PEPPER", "Password pepper"),
        option("argon2-memory-kib", "WARDEN_ARGON2_MEMORY_KIB", "Argon2id memory cost")
            .value_parser(clap::value_parser!(u32)),
        option("argon2-iterations", "WARDEN_ARGON2_ITERATIONS", "Argon2id iterations")
            .value_parser(clap::value_parser!(u32)),
        option("argon2-parallelism", "WARDEN_ARGON2_PARALLELISM", "Argon2id lanes")
            .value_parser(clap::value_parser!(u32)),
    ]
}

fn bootstrap_args() -> Vec<Arg> {
    vec![
        option("bootstrap-org-name", "WARDEN_BOOTSTRAP_ORG_NAME", "Root organization name"),
        option(
            "bootstrap-org-description",
            "WARDEN_BOOTSTRAP_ORG_DESCRIPTION",
            "Root organization description",
        ),
        option("bootstrap-org-domain", "WARDEN_BOOTSTRAP_ORG_DOMAIN", "Root organization domain"),
        option("bootstrap-admin-email", "WARDEN_BOOTSTRAP_ADMIN_EMAIL", "Administrator email"),
        option(
            "bootstrap-admin-username",
            "WARDEN_BOOTSTRAP_ADMIN_USERNAME",
            "Administrator username (defaults to the email)",
        ),
        secret(
            "bootstrap-admin-password",
            "WARDEN_BOOTSTRAP_ADMIN_PASSWORD",
            "Administrator password",
        ),
        option(
            "bootstrap-admin-first-name",
            "WARDEN_BOOTSTRAP_ADMIN_FIRST_NAME",
            "Administrator first name",
        ),
        option(
            "bootstrap-admin-last-name",
            "WARDEN_BOOTSTRAP_ADMIN_LAST_NAME",
            "Administrator last name",
        ),
    ]
}
