use std::sync::Arc;

use point_service::{
    adapters::database::memory::{MemoryBalanceStore, MemoryHistoryStore},
    cli::handle_line,
    commands::DomainLogic,
    config::Config,
    telemetry::init_logging,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config).map_err(|err| anyhow::anyhow!("cannot initialise logging: {err}"))?;

    let domain = DomainLogic::new(
        Arc::new(MemoryBalanceStore::default()),
        Arc::new(MemoryHistoryStore::default()),
    );
    info!("reading commands from stdin");

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();
    while let Some(line) = lines.next_line().await? {
        if let Some(response) = handle_line(&domain, &line).await {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            stdout.write_all(&out).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
