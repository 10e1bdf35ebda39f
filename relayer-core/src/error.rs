//! Error taxonomy for the relayer. Variants map directly to the
//! classification policy in the supervisor and release submitter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rate limit: {0}")]
    ProviderRateLimit(String),

    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("preflight revert: {0}")]
    PreflightRevert(String),

    #[error("timed out waiting for receipt")]
    Timeout,

    #[error("fatal misconfiguration: {0}")]
    Fatal(String),
}

impl RelayerError {
    /// True for destination-contract rejections that indicate the
    /// sequence has already been consumed — benign, treat as success.
    pub fn is_benign_already_used(&self) -> bool {
        matches!(self, RelayerError::PreflightRevert(reason)
            if reason.contains("Nonce has already been used"))
    }

    /// True for the one revert reason that indicates wrong key, wrong
    /// contract, or a wrong preimage — no amount of retrying helps.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, RelayerError::PreflightRevert(reason)
            if reason.contains("Invalid signature"))
    }

    /// True when the supervisor should back off and retry without
    /// advancing the checkpoint.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayerError::Transport(_)
                | RelayerError::ProviderRateLimit(_)
                | RelayerError::NonceConflict(_)
                | RelayerError::InsufficientFunds(_)
                | RelayerError::Timeout
        )
    }
}
