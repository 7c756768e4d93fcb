use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let action = warden_server::cli::start()?;
    action.execute().await
}
