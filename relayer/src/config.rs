//! Configuration for the bridge relayer, loaded from the environment.

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct Config {
    /// JSON-RPC endpoint for Chain A (the source, emitting lock events).
    pub source_rpc_url: String,
    /// JSON-RPC endpoint for Chain B (the destination, accepting releases).
    pub destination_rpc_url: String,
    /// Contract address emitting `TokensLocked` on the source chain.
    pub source_bridge_address: String,
    /// Contract address accepting `releaseTokens` on the destination chain.
    pub destination_bridge_address: String,
    /// 32-byte authority secret key, hex-encoded.
    pub signer_secret_key: String,

    /// Sleep between scanner ticks.
    pub poll_interval_ms: u64,
    /// Filesystem path for the checkpoint scalar.
    pub checkpoint_path: String,
    /// Per-query block range cap, absorbing provider limits.
    pub max_window: u64,
    /// Upper bound on awaiting one release receipt.
    pub tx_timeout_ms: u64,
    /// Bounded look-back used when no checkpoint exists yet.
    pub lookback_blocks: u64,
    /// Consecutive insufficient-funds classifications tolerated before
    /// escalating to fatal.
    pub max_insufficient_funds_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            source_rpc_url: required_env("RELAYER_SOURCE_RPC")?,
            destination_rpc_url: required_env("RELAYER_DESTINATION_RPC")?,
            source_bridge_address: required_env("RELAYER_SOURCE_BRIDGE")?,
            destination_bridge_address: required_env("RELAYER_DESTINATION_BRIDGE")?,
            signer_secret_key: required_env("RELAYER_SIGNER_KEY")?,

            poll_interval_ms: std::env::var("RELAYER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .context("invalid RELAYER_POLL_INTERVAL_MS")?,
            checkpoint_path: std::env::var("RELAYER_CHECKPOINT_PATH")
                .unwrap_or_else(|_| "./last_block.txt".into()),
            max_window: std::env::var("RELAYER_MAX_WINDOW")
                .unwrap_or_else(|_| "2000".into())
                .parse()
                .context("invalid RELAYER_MAX_WINDOW")?,
            tx_timeout_ms: std::env::var("RELAYER_TX_TIMEOUT_MS")
                .unwrap_or_else(|_| "60000".into())
                .parse()
                .context("invalid RELAYER_TX_TIMEOUT_MS")?,
            lookback_blocks: std::env::var("RELAYER_LOOKBACK_BLOCKS")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .context("invalid RELAYER_LOOKBACK_BLOCKS")?,
            max_insufficient_funds_retries: std::env::var("RELAYER_MAX_FUNDS_RETRIES")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .context("invalid RELAYER_MAX_FUNDS_RETRIES")?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {key}"))
}
