use anyhow::Result;
use clap::Parser;

use tailpost_daemon::cli::DaemonCli;
use tailpost_daemon::logging::init_tracing;
use tailpost_daemon::orchestrator::{Orchestrator, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = load_config(&cli).await?;

    if cli.validate {
        println!(
            "configuration OK: {} service(s): {}",
            config.tail.services.len(),
            config.tail.services.join(", ")
        );
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!("tailpost starting");

    Orchestrator::new(config)?.run().await
}
