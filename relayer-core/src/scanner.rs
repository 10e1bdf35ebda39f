//! Polls the source chain for new blocks and decodes the lock-event
//! log stream between the checkpoint and the current head.

use ethers::types::{Address, H256};
use ethers::utils::keccak256;

use crate::chain_client::ChainClient;
use crate::error::RelayerError;
use crate::types::{LockEvent, TOKENS_LOCKED_SIGNATURE};

/// One tick's worth of decoded events, plus the block height the batch
/// covers. The checkpoint may only advance to `to` once every event in
/// the batch has reached terminal status.
pub struct ScanBatch {
    pub events: Vec<LockEvent>,
    pub to: u64,
}

pub struct EventScanner {
    bridge_address: Address,
    topic0: H256,
    max_window: u64,
    lookback_blocks: u64,
}

impl EventScanner {
    pub fn new(bridge_address: Address, max_window: u64, lookback_blocks: u64) -> Self {
        Self {
            bridge_address,
            topic0: H256::from(keccak256(TOKENS_LOCKED_SIGNATURE.as_bytes())),
            max_window,
            lookback_blocks,
        }
    }

    /// Bootstrap policy: start at `max(0, head - lookback_blocks)` when
    /// no checkpoint exists yet, rather than rescanning full history.
    pub fn bootstrap_cursor(&self, checkpoint: u64, head: u64) -> u64 {
        if checkpoint == 0 {
            head.saturating_sub(self.lookback_blocks)
        } else {
            checkpoint
        }
    }

    /// One scan tick. Returns `None` if the chain head has not moved
    /// past `cursor` since the last tick.
    pub async fn scan_tick(
        &self,
        client: &ChainClient,
        cursor: u64,
    ) -> Result<Option<ScanBatch>, RelayerError> {
        let head = client.current_head().await?;
        if head <= cursor {
            return Ok(None);
        }

        let to = head.min(cursor + self.max_window);
        let events = client
            .query_logs(self.bridge_address, self.topic0, cursor + 1, to)
            .await?;

        Ok(Some(ScanBatch { events, to }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> EventScanner {
        EventScanner::new(Address::zero(), 2000, 100)
    }

    #[test]
    fn bootstrap_with_no_checkpoint_looks_back_bounded() {
        let s = scanner();
        assert_eq!(s.bootstrap_cursor(0, 1000), 900);
    }

    #[test]
    fn bootstrap_with_no_checkpoint_never_goes_negative() {
        let s = scanner();
        assert_eq!(s.bootstrap_cursor(0, 50), 0);
    }

    #[test]
    fn bootstrap_with_existing_checkpoint_resumes_from_it() {
        let s = scanner();
        assert_eq!(s.bootstrap_cursor(500, 10_000), 500);
    }

    #[test]
    fn topic0_matches_known_signature_hash() {
        let s = scanner();
        let expected = H256::from(keccak256(TOKENS_LOCKED_SIGNATURE.as_bytes()));
        assert_eq!(s.topic0, expected);
    }
}
