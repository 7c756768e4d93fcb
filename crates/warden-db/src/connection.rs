//! SurrealDB connection management.

use std::fmt;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

/// Where the credential store lives and how to log in to it.
#[derive(Clone)]
pub struct DbConfig {
    /// Host and port of the WebSocket endpoint. A `ws://` scheme is
    /// accepted and stripped.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "identity".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl DbConfig {
    /// The address handed to the WebSocket engine.
    pub fn endpoint(&self) -> &str {
        let url = self.url.trim();
        url.strip_prefix("ws://").unwrap_or(url).trim_end_matches('/')
    }
}

/// Owns the connection shared by every repository.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, authenticate as root and select the configured
    /// namespace and database. The error names the step that failed.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let endpoint = config.endpoint();
        info!(
            endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(endpoint)
            .await
            .map_err(|source| DbError::connect(format!("opening {endpoint}"), source))?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(|source| {
            DbError::connect(format!("signing in as {}", config.username), source)
        })?;
        debug!(username = %config.username, "signed in to SurrealDB");

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|source| {
                DbError::connect(
                    format!("selecting {}/{}", config.namespace, config.database),
                    source,
                )
            })?;

        info!(endpoint, "Connected to SurrealDB");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
