use anyhow::Result;
use packagist_sync::app::Application;
use packagist_sync::{config::Settings, telemetry::init_subscribers};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_subscribers()?;

    let configuration = Settings::build()?;
    tracing::info!(
        name = %configuration.application.name,
        version = %configuration.application.version,
        "starting package list sync"
    );

    let application = Application::build(configuration)?;

    let report = application.run_until_synced().await?;

    tracing::info!(seen = report.seen, pruned = report.pruned, "sync finished");
    println!("Laravel package list syncs successfully.");

    Ok(())
}
