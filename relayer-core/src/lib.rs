//! Core primitives for the one-way cross-chain token bridge relayer:
//! the chain client, the authorization signer, the checkpoint store,
//! the processed-set, the event scanner, and the release submitter.
//!
//! The orchestrating control loop (the supervisor) lives in the
//! `relayer` binary crate, which composes these pieces.

pub mod chain_client;
pub mod checkpoint;
pub mod error;
pub mod processed_set;
pub mod scanner;
pub mod signer;
pub mod submitter;
pub mod types;

pub use chain_client::{ChainClient, Receipt, ReceiptStatus};
pub use checkpoint::CheckpointStore;
pub use error::RelayerError;
pub use processed_set::ProcessedSet;
pub use scanner::{EventScanner, ScanBatch};
pub use signer::AuthorizationSigner;
pub use submitter::ReleaseSubmitter;
pub use types::{Authorization, LockEvent, ReleaseOutcome};
