//! Password hashing and verification using Argon2id.
//!
//! Hashing is deliberately expensive. The async wrappers move the work
//! onto the blocking thread pool so request tasks are never stalled.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// If `pepper` is provided it is prepended to the password before
/// verification; it must match the pepper used during hashing. Cost
/// parameters are read from the PHC string itself.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let input = peppered(password, pepper);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}

/// Argon2id hasher bound to the configured cost and pepper.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    pepper: Option<Arc<str>>,
    /// Hash of a fixed string, verified against when the account does
    /// not exist so both failure paths cost the same.
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;

        let mut service = Self {
            params,
            pepper: config.pepper.as_deref().map(Arc::from),
            dummy_hash: Arc::from(""),
        };
        service.dummy_hash = Arc::from(service.hash("warden-timing-equalizer")?);
        Ok(service)
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let input = peppered(password, self.pepper.as_deref());
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(input.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        verify_password(password, hash, self.pepper.as_deref())
    }

    pub async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&password))
            .await
            .map_err(|e| AuthError::Crypto(format!("hashing task failed: {e}")))?
    }

    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Crypto(format!("verification task failed: {e}")))?
    }

    /// Burn one verification against the dummy hash. Always `false`.
    pub async fn verify_dummy(&self, password: String) -> Result<bool, AuthError> {
        let hash = self.dummy_hash.to_string();
        self.verify_blocking(password, hash).await.map(|_| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so the suite stays fast.
    fn test_service(pepper: Option<&str>) -> PasswordService {
        PasswordService::from_config(&AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            pepper: pepper.map(Into::into),
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn correct_password_matches() {
        let service = test_service(None);
        let hash = service.hash("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let service = test_service(None);
        let hash = service.hash("hunter2").unwrap();
        assert!(!service.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let service = test_service(Some("pepper!"));
        let hash = service.hash("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash, Some("pepper!")).unwrap());
        assert!(!verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let service = test_service(None);
        assert_ne!(service.hash("same").unwrap(), service.hash("same").unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_password("pw", "not-a-hash", None).is_err());
    }

    #[test]
    fn invalid_cost_parameters_are_rejected() {
        let result = PasswordService::from_config(&AuthConfig {
            argon2_parallelism: 0,
            ..AuthConfig::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dummy_verification_never_matches() {
        let service = test_service(None);
        assert!(!service.verify_dummy("warden-timing-equalizer".into()).await.unwrap());
    }
}
