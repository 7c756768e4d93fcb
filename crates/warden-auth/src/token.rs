//! HS256 JWT signing and verification.
//!
//! One shared secret signs both token types. Verification pins the
//! algorithm list to HS256 so a token whose header names any other
//! algorithm is rejected before its signature is considered.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::claims::{Claims, TokenType};
use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &SecretString, issuer: &str, audience: &str) -> Result<Self, AuthError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(AuthError::Crypto("JWT signing secret is empty".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(&config.jwt_secret, &config.jwt_issuer, &config.jwt_audience)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify signature, algorithm, issuer, audience and time window.
    /// The token type is not checked.
    pub fn decode_any(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }

    /// [`decode_any`](Self::decode_any) plus a token type check.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.decode_any(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType { expected });
        }
        Ok(claims)
    }
}
