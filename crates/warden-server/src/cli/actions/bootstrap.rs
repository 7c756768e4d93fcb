use anyhow::Result;

use crate::config::ServerConfig;

/// Provision the root organization and administrator, print their
/// identity and exit.
///
/// # Errors
///
/// Returns an error if the database is unreachable or provisioning fails.
pub async fn execute(config: ServerConfig, force_password: bool) -> Result<()> {
    let manager = super::connect(&config).await?;
    let (_, outcome) = super::prepare(manager.client(), &config, force_password).await?;

    println!(
        "organization: {} ({})",
        outcome.organization.name, outcome.organization.id
    );
    println!(
        "administrator: {} <{}> ({})",
        outcome.admin.username, outcome.admin.email, outcome.admin.id
    );
    Ok(())
}
