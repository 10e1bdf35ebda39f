//! Top-level control loop: composes the scanner and submitter,
//! advances the checkpoint, and handles signals and error-class
//! dependent backoff. See the state machine in the design notes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::types::Address;
use relayer_core::{
    AuthorizationSigner, ChainClient, CheckpointStore, EventScanner, ProcessedSet,
    RelayerError, ReleaseOutcome, ReleaseSubmitter,
};
use tracing::{error, info, warn};

use crate::config::Config;

pub struct RelayerSupervisor {
    source: ChainClient,
    destination: ChainClient,
    signer: AuthorizationSigner,
    checkpoint: CheckpointStore,
    scanner: EventScanner,
    submitter: ReleaseSubmitter,
    poll_interval: Duration,
    cancelled: Arc<AtomicBool>,
}

impl RelayerSupervisor {
    pub async fn start(config: &Config) -> Result<Self> {
        let source = ChainClient::new_readonly(&config.source_rpc_url)
            .context("failed to construct source chain client")?;
        let destination =
            ChainClient::new_with_signer(&config.destination_rpc_url, &config.signer_secret_key)
                .context("failed to construct destination chain client")?;
        let signer = AuthorizationSigner::new(&config.signer_secret_key)
            .context("failed to construct authorization signer")?;

        let source_bridge: Address = config
            .source_bridge_address
            .parse()
            .context("invalid source bridge address")?;
        let destination_bridge: Address = config
            .destination_bridge_address
            .parse()
            .context("invalid destination bridge address")?;

        let source_network = source
            .network_id()
            .await
            .context("failed to reach source chain")?;
        let destination_network = destination
            .network_id()
            .await
            .context("failed to reach destination chain")?;
        let signer_address = destination
            .signer_address()
            .context("destination client missing signer")?;

        info!(
            source_network,
            destination_network,
            signer = %signer_address,
            "connected to both chains"
        );

        match destination.signer_balance().await {
            Ok(balance) if balance.is_zero() => {
                warn!(signer = %signer_address, "destination signer holds zero gas balance");
            }
            Ok(balance) => {
                info!(signer = %signer_address, balance = %balance, "destination signer balance");
            }
            Err(err) => warn!(error = %err, "failed to read destination signer balance"),
        }

        let checkpoint = CheckpointStore::new(config.checkpoint_path.clone());
        let scanner = EventScanner::new(source_bridge, config.max_window, config.lookback_blocks);
        let submitter = ReleaseSubmitter::new(
            destination_bridge,
            Duration::from_millis(config.tx_timeout_ms),
            config.max_insufficient_funds_retries,
        );

        Ok(Self {
            source,
            destination,
            signer,
            checkpoint,
            scanner,
            submitter,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Install the SIGINT/SIGTERM handler. Flips the cancellation flag
    /// the main loop polls at its next suspension point; in-flight
    /// submissions are awaited to completion rather than aborted.
    pub fn install_signal_handler(&self) {
        let cancelled = self.cancelled.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received; finishing in-flight work then exiting");
            cancelled.store(true, Ordering::SeqCst);
        });
    }

    /// Runs until a shutdown signal is observed (clean exit) or a
    /// fatal classification occurs (returned as `Err`).
    pub async fn run(&mut self) -> Result<()> {
        let mut cursor = self.checkpoint.load();
        let mut funds_retry_count: u32 = 0;
        let mut processed = ProcessedSet::new();

        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                info!("supervisor loop exiting cleanly");
                return Ok(());
            }

            if cursor == 0 {
                match self.source.current_head().await {
                    Ok(head) => cursor = self.scanner.bootstrap_cursor(0, head),
                    Err(err) => {
                        warn!(error = %err, "failed to read source head during bootstrap");
                        tokio::time::sleep(self.poll_interval * 2).await;
                        continue;
                    }
                }
            }

            let tick_result = self.tick(cursor, &mut processed, &mut funds_retry_count).await;

            if self.cancelled.load(Ordering::SeqCst) {
                info!("supervisor loop exiting cleanly");
                return Ok(());
            }

            match tick_result {
                Ok(Some(new_cursor)) => {
                    cursor = new_cursor;
                    tokio::time::sleep(self.poll_interval).await;
                }
                Ok(None) => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(err) if err.is_retryable() => {
                    warn!(error = %err, "retryable tick failure; backing off");
                    tokio::time::sleep(self.poll_interval * 2).await;
                }
                Err(err) => {
                    error!(error = %err, "fatal classification; halting relayer");
                    return Err(err.into());
                }
            }
        }
    }

    /// One supervisor tick: scan, submit in order, and report the new
    /// cursor only if the whole batch reached terminal status.
    async fn tick(
        &self,
        cursor: u64,
        processed: &mut ProcessedSet,
        funds_retry_count: &mut u32,
    ) -> Result<Option<u64>, RelayerError> {
        let batch = match self.scanner.scan_tick(&self.source, cursor).await? {
            Some(batch) => batch,
            None => return Ok(None),
        };

        if !batch.events.is_empty() {
            info!(count = batch.events.len(), to_block = batch.to, "scanned batch");
        }

        for event in &batch.events {
            if self.cancelled.load(Ordering::SeqCst) {
                info!("shutdown requested mid-batch; not advancing checkpoint past partial work");
                return Ok(None);
            }

            let outcome = self
                .submitter
                .submit(
                    event,
                    &self.signer,
                    &self.destination,
                    processed,
                    funds_retry_count,
                )
                .await?;

            if outcome == ReleaseOutcome::Retryable {
                return Err(RelayerError::Transport(format!(
                    "sequence {} did not reach terminal status this tick",
                    event.sequence
                )));
            }
        }

        self.checkpoint.store(batch.to);
        Ok(Some(batch.to))
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
