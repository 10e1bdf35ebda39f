//! One-way cross-chain token bridge relayer: observes lock events on
//! a source chain and submits authenticated release transactions on
//! a destination chain. See `SPEC_FULL.md` at the repository root for
//! the full design.

mod config;
mod supervisor;

use config::Config;
use supervisor::RelayerSupervisor;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "relayer exiting with error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let mut supervisor = RelayerSupervisor::start(&config).await?;
    supervisor.install_signal_handler();
    supervisor.run().await
}
