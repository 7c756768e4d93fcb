//! Authentication and bootstrap configuration.

use secrecy::SecretString;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret for signing access and refresh tokens.
    pub jwt_secret: SecretString,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// JWT audience (`aud` claim, emitted as a one-element array).
    pub jwt_audience: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Consecutive failed password checks that lock the account
    /// (default: 5). Zero disables lockout.
    pub max_login_attempts: u32,
    /// Lockout duration in seconds (default: 900 = 15 minutes).
    pub lockout_duration_secs: u64,
    /// Minimum password length for registration and bootstrap.
    pub min_password_length: usize,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Argon2id memory cost in KiB (default: 19_456).
    pub argon2_memory_kib: u32,
    /// Argon2id iterations (default: 2).
    pub argon2_iterations: u32,
    /// Argon2id lanes (default: 1).
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::from(String::new()),
            jwt_issuer: "warden".into(),
            jwt_audience: "warden".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            max_login_attempts: 5,
            lockout_duration_secs: 900,
            min_password_length: 8,
            pepper: None,
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// Root organization and administrator provisioned at start-up.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub organization_name: String,
    pub organization_description: String,
    pub organization_domain: String,
    pub admin_email: String,
    pub admin_username: String,
    pub admin_password: SecretString,
    pub admin_first_name: String,
    pub admin_last_name: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            organization_name: "Root Organization".into(),
            organization_description: "System root organization".into(),
            organization_domain: "root.local".into(),
            admin_email: "admin@root.local".into(),
            admin_username: "root-admin".into(),
            admin_password: SecretString::from("ChangeMe123!".to_string()),
            admin_first_name: "System".into(),
            admin_last_name: "Administrator".into(),
        }
    }
}
