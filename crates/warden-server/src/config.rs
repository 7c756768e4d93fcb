//! Process configuration assembled from parsed arguments and secret
//! overrides.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::ArgMatches;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use warden_auth::{AuthConfig, BootstrapConfig};
use warden_db::DbConfig;

use crate::secrets::{self, FileSecretSource, SecretSource};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub secrets_dir: Option<PathBuf>,
}

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn copied<T: Copy + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.get_one::<T>(id).copied()
}

impl ServerConfig {
    /// Build from arguments alone. Unset options keep the library
    /// defaults.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let listen = copied::<SocketAddr>(matches, "listen")
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let mut db = DbConfig::default();
        if let Some(url) = string(matches, "db-url") {
            db.url = url;
        }
        if let Some(namespace) = string(matches, "db-namespace") {
            db.namespace = namespace;
        }
        if let Some(database) = string(matches, "db-database") {
            db.database = database;
        }
        if let Some(username) = string(matches, "db-username") {
            db.username = username;
        }
        if let Some(password) = string(matches, "db-password") {
            db.password = password;
        }

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret: SecretString::from(string(matches, "jwt-secret").unwrap_or_default()),
            jwt_issuer: string(matches, "jwt-issuer").unwrap_or(defaults.jwt_issuer),
            jwt_audience: string(matches, "jwt-audience").unwrap_or(defaults.jwt_audience),
            access_token_lifetime_secs: copied(matches, "access-token-lifetime")
                .unwrap_or(defaults.access_token_lifetime_secs),
            refresh_token_lifetime_secs: copied(matches, "refresh-token-lifetime")
                .unwrap_or(defaults.refresh_token_lifetime_secs),
            max_login_attempts: copied(matches, "max-login-attempts")
                .unwrap_or(defaults.max_login_attempts),
            lockout_duration_secs: copied(matches, "lockout-duration")
                .unwrap_or(defaults.lockout_duration_secs),
            min_password_length: copied(matches, "min-password-length")
                .unwrap_or(defaults.min_password_length),
            pepper: string(matches, "password-pepper").filter(|p| !p.is_empty()),
            argon2_memory_kib: copied(matches, "argon2-memory-kib")
                .unwrap_or(defaults.argon2_memory_kib),
            argon2_iterations: copied(matches, "argon2-iterations")
                .unwrap_or(defaults.argon2_iterations),
            argon2_parallelism: copied(matches, "argon2-parallelism")
                .unwrap_or(defaults.argon2_parallelism),
        };

        let defaults = BootstrapConfig::default();
        let bootstrap = BootstrapConfig {
            organization_name: string(matches, "bootstrap-org-name")
                .unwrap_or(defaults.organization_name),
            organization_description: string(matches, "bootstrap-org-description")
                .unwrap_or(defaults.organization_description),
            organization_domain: string(matches, "bootstrap-org-domain")
                .unwrap_or(defaults.organization_domain),
            admin_email: string(matches, "bootstrap-admin-email").unwrap_or(defaults.admin_email),
            admin_username: string(matches, "bootstrap-admin-username")
                .unwrap_or(defaults.admin_username),
            admin_password: string(matches, "bootstrap-admin-password")
                .map(SecretString::from)
                .unwrap_or(defaults.admin_password),
            admin_first_name: string(matches, "bootstrap-admin-first-name")
                .unwrap_or(defaults.admin_first_name),
            admin_last_name: string(matches, "bootstrap-admin-last-name")
                .unwrap_or(defaults.admin_last_name),
        };

        Ok(Self {
            listen,
            db,
            auth,
            bootstrap,
            secrets_dir: string(matches, "secrets-dir").map(PathBuf::from),
        })
    }

    /// Replace configured secrets with the values `source` provides.
    pub fn apply_secrets(&mut self, source: &impl SecretSource) -> Result<()> {
        if let Some(secret) = source.secret(secrets::JWT_SECRET)? {
            info!("JWT signing secret loaded from secret source");
            self.auth.jwt_secret = secret;
        }
        if let Some(password) = source.secret(secrets::BOOTSTRAP_ADMIN_PASSWORD)? {
            info!("bootstrap administrator password loaded from secret source");
            self.bootstrap.admin_password = password;
        }
        if let Some(password) = secrets::exposed(source, secrets::DB_PASSWORD)? {
            info!("database password loaded from secret source");
            self.db.password = password;
        }
        Ok(())
    }

    /// Parse, apply the `--secrets-dir` overrides if any, and check the
    /// result is usable.
    pub fn load(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::from_matches(matches)?;
        if let Some(dir) = config.secrets_dir.clone() {
            let source = FileSecretSource::new(dir);
            info!(dir = %source.dir().display(), "applying secret overrides");
            config.apply_secrets(&source)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.expose_secret().is_empty() {
            bail!(
                "a JWT signing secret is required \
                 (--jwt-secret, WARDEN_JWT_SECRET or <secrets-dir>/JWT_SECRET)"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    struct StaticSource(&'static str);

    impl SecretSource for StaticSource {
        fn secret(&self, name: &str) -> Result<Option<SecretString>> {
            Ok((name == secrets::JWT_SECRET).then(|| SecretString::from(self.0.to_string())))
        }
    }

    fn parse(args: &[&str]) -> ServerConfig {
        let matches = commands::new().try_get_matches_from(args).unwrap();
        ServerConfig::from_matches(&matches).unwrap()
    }

    #[test]
    fn unset_options_keep_defaults() {
        let config = parse(&["warden"]);
        let defaults = AuthConfig::default();

        assert_eq!(config.listen, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.auth.max_login_attempts, defaults.max_login_attempts);
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert_eq!(config.bootstrap.admin_username, "root-admin");
        assert_eq!(config.db.namespace, "warden");
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "warden",
            "--listen",
            "127.0.0.1:9000",
            "--jwt-secret",
            "flag-secret",
            "--max-login-attempts",
            "3",
            "--lockout-duration",
            "60",
            "--bootstrap-org-domain",
            "corp.example",
            "--db-url",
            "db:8000",
        ]);

        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.auth.jwt_secret.expose_secret(), "flag-secret");
        assert_eq!(config.auth.max_login_attempts, 3);
        assert_eq!(config.auth.lockout_duration_secs, 60);
        assert_eq!(config.bootstrap.organization_domain, "corp.example");
        assert_eq!(config.db.url, "db:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn secret_source_overrides_flag() {
        let mut config = parse(&["warden", "--jwt-secret", "flag-secret"]);
        config.apply_secrets(&StaticSource("vault-secret")).unwrap();
        assert_eq!(config.auth.jwt_secret.expose_secret(), "vault-secret");
    }

    #[test]
    fn empty_signing_secret_is_refused() {
        let config = parse(&["warden"]);
        assert!(config.validate().is_err());
    }
}
