//! Start-up secret overrides.
//!
//! A [`SecretSource`] is consulted once, after flags and environment
//! variables are parsed. A value it returns replaces the configured one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

/// Token-signing secret.
pub const JWT_SECRET: &str = "JWT_SECRET";
/// Password of the bootstrap administrator.
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "BOOTSTRAP_ADMIN_PASSWORD";
/// SurrealDB root password.
pub const DB_PASSWORD: &str = "DB_PASSWORD";

pub trait SecretSource {
    /// `Ok(None)` when the source has no value for `name`.
    fn secret(&self, name: &str) -> Result<Option<SecretString>>;
}

/// Reads one file per secret from a directory, e.g. a mounted
/// Kubernetes or Docker secrets volume.
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SecretSource for FileSecretSource {
    fn secret(&self, name: &str) -> Result<Option<SecretString>> {
        let path = self.dir.join(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read secret {}", path.display()));
            }
        };

        let value = raw.trim_end_matches(['\r', '\n']);
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(value.to_string())))
    }
}

/// Fetch `name` as a plain string, for consumers that do not take a
/// [`SecretString`].
pub fn exposed(source: &impl SecretSource, name: &str) -> Result<Option<String>> {
    Ok(source
        .secret(name)?
        .map(|secret| secret.expose_secret().to_string()))
}
