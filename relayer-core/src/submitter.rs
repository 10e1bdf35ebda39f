//! For each lock event: sign, submit the release call, await the
//! receipt, and classify the outcome per the policy table in §7 of
//! the design (transient / benign / fatal / resource-exhaustion).

use std::time::Duration;

use ethers::abi::{self, Token};
use ethers::types::Bytes;
use ethers::utils::keccak256;
use tracing::{error, info, warn};

use crate::chain_client::{ChainClient, ReceiptStatus};
use crate::error::RelayerError;
use crate::processed_set::ProcessedSet;
use crate::signer::AuthorizationSigner;
use crate::types::{LockEvent, ReleaseOutcome};
use ethers::types::Address;

/// Function signature the destination bridge exposes. Used only to
/// derive the 4-byte selector; the ABI types are encoded by hand to
/// match exactly.
const RELEASE_TOKENS_SIGNATURE: &str = "releaseTokens(address,uint256,uint256,bytes)";

pub struct ReleaseSubmitter {
    destination_bridge_address: Address,
    tx_timeout: Duration,
    max_insufficient_funds_retries: u32,
}

impl ReleaseSubmitter {
    pub fn new(
        destination_bridge_address: Address,
        tx_timeout: Duration,
        max_insufficient_funds_retries: u32,
    ) -> Self {
        Self {
            destination_bridge_address,
            tx_timeout,
            max_insufficient_funds_retries,
        }
    }

    /// Process one lock event to terminal status or a retryable error.
    /// A fatal classification is returned as `Err(RelayerError::Fatal)`
    /// and must halt the supervisor.
    pub async fn submit(
        &self,
        event: &LockEvent,
        signer: &AuthorizationSigner,
        destination: &ChainClient,
        processed: &mut ProcessedSet,
        funds_retry_count: &mut u32,
    ) -> Result<ReleaseOutcome, RelayerError> {
        if processed.contains(event.sequence) {
            return Ok(ReleaseOutcome::Terminal);
        }

        info!(
            sequence = %event.sequence,
            recipient = %event.recipient,
            amount = %event.amount,
            "processing lock event"
        );

        let auth = signer
            .sign(event.recipient, event.amount, event.sequence)
            .await?;
        let calldata = encode_release_tokens(&auth);

        let handle = match destination
            .submit_signed_call(self.destination_bridge_address, calldata)
            .await
        {
            Ok(handle) => handle,
            Err(err) => return self.classify(err, event, processed, funds_retry_count),
        };

        match destination.await_receipt(handle, self.tx_timeout).await {
            Ok(receipt) if receipt.status == ReceiptStatus::Success => {
                processed.insert(event.sequence);
                *funds_retry_count = 0;
                info!(sequence = %event.sequence, "release confirmed");
                Ok(ReleaseOutcome::Terminal)
            }
            Ok(_) => {
                let err = RelayerError::Fatal(format!(
                    "release for sequence {} mined but reverted",
                    event.sequence
                ));
                error!(sequence = %event.sequence, "{}", err);
                Err(err)
            }
            Err(err) => self.classify(err, event, processed, funds_retry_count),
        }
    }

    fn classify(
        &self,
        err: RelayerError,
        event: &LockEvent,
        processed: &mut ProcessedSet,
        funds_retry_count: &mut u32,
    ) -> Result<ReleaseOutcome, RelayerError> {
        if err.is_benign_already_used() {
            info!(
                sequence = %event.sequence,
                "sequence already consumed on destination; treating as success"
            );
            processed.insert(event.sequence);
            return Ok(ReleaseOutcome::Terminal);
        }

        if err.is_invalid_signature() {
            let fatal = RelayerError::Fatal(format!(
                "invalid signature rejected for sequence {} (recipient {}, amount {}): {}",
                event.sequence, event.recipient, event.amount, err
            ));
            error!(
                sequence = %event.sequence,
                recipient = %event.recipient,
                amount = %event.amount,
                "{}",
                fatal
            );
            return Err(fatal);
        }

        if let RelayerError::InsufficientFunds(_) = err {
            *funds_retry_count += 1;
            warn!(
                sequence = %event.sequence,
                attempt = *funds_retry_count,
                "insufficient funds on destination signer; awaiting operator top-up"
            );
            if *funds_retry_count > self.max_insufficient_funds_retries {
                let fatal = RelayerError::Fatal(format!(
                    "insufficient funds persisted beyond {} retries",
                    self.max_insufficient_funds_retries
                ));
                error!("{}", fatal);
                return Err(fatal);
            }
            return Ok(ReleaseOutcome::Retryable);
        }

        if err.is_retryable() {
            warn!(sequence = %event.sequence, error = %err, "retryable failure, will retry");
            return Ok(ReleaseOutcome::Retryable);
        }

        let fatal = RelayerError::Fatal(format!(
            "unexpected revert for sequence {} (recipient {}, amount {}, destination {}): {}",
            event.sequence, event.recipient, event.amount, self.destination_bridge_address, err
        ));
        error!("{}", fatal);
        Err(fatal)
    }
}

fn encode_release_tokens(auth: &crate::types::Authorization) -> Bytes {
    let selector = &keccak256(RELEASE_TOKENS_SIGNATURE.as_bytes())[..4];
    let params = abi::encode(&[
        Token::Address(auth.recipient),
        Token::Uint(auth.amount),
        Token::Uint(auth.sequence),
        Token::Bytes(auth.signature.to_vec()),
    ]);

    let mut data = Vec::with_capacity(4 + params.len());
    data.extend_from_slice(selector);
    data.extend_from_slice(&params);
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Authorization;
    use ethers::types::U256;

    #[test]
    fn calldata_starts_with_function_selector() {
        let auth = Authorization {
            recipient: Address::zero(),
            amount: U256::from(1u64),
            sequence: U256::from(1u64),
            signature: [0u8; 65],
        };
        let calldata = encode_release_tokens(&auth);
        let selector = &keccak256(RELEASE_TOKENS_SIGNATURE.as_bytes())[..4];
        assert_eq!(&calldata[0..4], selector);
    }

    #[test]
    fn calldata_length_matches_abi_layout() {
        let auth = Authorization {
            recipient: Address::zero(),
            amount: U256::from(1u64),
            sequence: U256::from(1u64),
            signature: [7u8; 65],
        };
        let calldata = encode_release_tokens(&auth);
        // selector(4) + address(32) + uint256(32) + uint256(32)
        // + bytes head(32) + bytes len(32) + bytes data padded to 96.
        assert_eq!(calldata.len(), 4 + 32 * 5 + 96);
    }
}
