//! Core data types shared across the relayer pipeline.

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// The canonical event signature hashed to produce `TokensLocked`'s topic0.
pub const TOKENS_LOCKED_SIGNATURE: &str = "TokensLocked(uint256,address,uint256)";

/// A decoded `TokensLocked` log observed on the source chain.
///
/// `sequence` is contract-assigned and strictly increasing with no gaps;
/// `(source_block, log_index)` gives the emission order the scanner must
/// preserve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub sequence: U256,
    pub recipient: Address,
    pub amount: U256,
    pub source_block: u64,
    pub source_tx: H256,
    pub log_index: u64,
}

/// A signed authorization ready to submit to the destination bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub recipient: Address,
    pub amount: U256,
    pub sequence: U256,
    /// 65-byte ECDSA signature (r || s || v) over the Ethereum-prefixed preimage digest.
    pub signature: [u8; 65],
}

/// Outcome of one release submission, after receipt classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Mined with success status, or benign already-consumed rejection.
    Terminal,
    /// Transient failure; the supervisor should back off and retry later.
    Retryable,
}
