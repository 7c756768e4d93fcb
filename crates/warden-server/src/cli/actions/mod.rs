pub mod bootstrap;
pub mod serve;

use anyhow::{Context, Result};
use surrealdb::{Connection, Surreal};
use tracing::info;
use warden_auth::BootstrapOutcome;
use warden_db::{DbManager, run_migrations};

use crate::api::AppState;
use crate::config::ServerConfig;

#[derive(Debug)]
pub enum Action {
    Serve(ServerConfig),
    Bootstrap {
        config: ServerConfig,
        force_password: bool,
    },
}

impl Action {
    /// Execute the action.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable, bootstrap fails
    /// or the listener cannot be bound.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Serve(config) => serve::execute(config).await,
            Self::Bootstrap {
                config,
                force_password,
            } => bootstrap::execute(config, force_password).await,
        }
    }
}

/// Connect and migrate.
async fn connect(config: &ServerConfig) -> Result<DbManager> {
    let manager = DbManager::connect(&config.db)
        .await
        .context("failed to connect to SurrealDB")?;
    run_migrations(manager.client())
        .await
        .context("failed to run migrations")?;
    Ok(manager)
}

/// Build the services over `db` and ensure the root organization and
/// administrator exist. Any failure here is fatal to the process.
pub async fn prepare<C: Connection>(
    db: &Surreal<C>,
    config: &ServerConfig,
    force_password: bool,
) -> Result<(AppState<C>, BootstrapOutcome)> {
    let state = AppState::new(db, &config.auth).context("invalid authentication configuration")?;
    let outcome = state
        .provisioning
        .bootstrap_admin(&config.bootstrap, force_password)
        .await
        .context("bootstrap failed")?;
    info!(
        organization_id = %outcome.organization.id,
        admin_id = %outcome.admin.id,
        "bootstrap complete"
    );
    Ok((state, outcome))
}
