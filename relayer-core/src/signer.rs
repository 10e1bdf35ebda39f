//! Authorization signer: builds the canonical preimage the destination
//! contract recomputes and signs it with the held authority key.
//!
//! The preimage is FIXED by the external contract — any deviation
//! silently fails verification on-chain, so the byte layout here must
//! match `(recipient: 20B, amount: 32B BE, sequence: 32B BE)` exactly.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use ethers::utils::{hash_message, keccak256};

use crate::error::RelayerError;
use crate::types::Authorization;

pub struct AuthorizationSigner {
    wallet: LocalWallet,
}

impl AuthorizationSigner {
    pub fn new(secret_key: &str) -> Result<Self, RelayerError> {
        let wallet: LocalWallet = secret_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| RelayerError::Fatal(format!("invalid signer secret key: {e}")))?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign over the canonical preimage for `(recipient, amount, sequence)`.
    ///
    /// Pure function of its inputs and the held key; never touches the
    /// network.
    pub async fn sign(
        &self,
        recipient: Address,
        amount: U256,
        sequence: U256,
    ) -> Result<Authorization, RelayerError> {
        let digest = canonical_preimage_digest(recipient, amount, sequence);
        let prefixed = hash_message(digest);

        let signature = self
            .wallet
            .sign_hash(prefixed)
            .map_err(|e| RelayerError::Fatal(format!("signing failed: {e}")))?;

        Ok(Authorization {
            recipient,
            amount,
            sequence,
            signature: signature.into(),
        })
    }
}

/// keccak256(recipient(20B) || amount(32B BE) || sequence(32B BE)),
/// concatenated in order with no padding between fields.
pub fn canonical_preimage_digest(recipient: Address, amount: U256, sequence: U256) -> [u8; 32] {
    let mut bytes = Vec::with_capacity(20 + 32 + 32);
    bytes.extend_from_slice(recipient.as_bytes());

    let mut amount_be = [0u8; 32];
    amount.to_big_endian(&mut amount_be);
    bytes.extend_from_slice(&amount_be);

    let mut sequence_be = [0u8; 32];
    sequence.to_big_endian(&mut sequence_be);
    bytes.extend_from_slice(&sequence_be);

    keccak256(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> AuthorizationSigner {
        // Well-known anvil/hardhat default test key #0.
        AuthorizationSigner::new(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sign_is_deterministic_for_fixed_inputs() {
        let signer = test_signer();
        let recipient: Address = "0x90F79bf6EB2c4f870365E785982E1f101E93b906"
            .parse()
            .unwrap();
        let amount = U256::from(100u64) * U256::exp10(18);
        let sequence = U256::from(1u64);

        let auth1 = signer.sign(recipient, amount, sequence).await.unwrap();
        let auth2 = signer.sign(recipient, amount, sequence).await.unwrap();

        assert_eq!(auth1.signature, auth2.signature);
        assert_eq!(auth1.recipient, recipient);
        assert_eq!(auth1.amount, amount);
        assert_eq!(auth1.sequence, sequence);
    }

    #[test]
    fn preimage_changes_with_any_field() {
        let recipient: Address = "0x90F79bf6EB2c4f870365E785982E1f101E93b906"
            .parse()
            .unwrap();
        let base = canonical_preimage_digest(recipient, U256::from(1u64), U256::from(1u64));
        let diff_amount = canonical_preimage_digest(recipient, U256::from(2u64), U256::from(1u64));
        let diff_sequence =
            canonical_preimage_digest(recipient, U256::from(1u64), U256::from(2u64));

        assert_ne!(base, diff_amount);
        assert_ne!(base, diff_sequence);
    }

    #[tokio::test]
    async fn signature_round_trip_verifies_against_signer_address() {
        let signer = test_signer();
        let recipient: Address = "0x90F79bf6EB2c4f870365E785982E1f101E93b906"
            .parse()
            .unwrap();
        let amount = U256::from(50u64);
        let sequence = U256::from(7u64);

        let auth = signer.sign(recipient, amount, sequence).await.unwrap();

        let digest = canonical_preimage_digest(recipient, amount, sequence);
        let prefixed = hash_message(digest);
        let signature = ethers::types::Signature::try_from(&auth.signature[..]).unwrap();

        assert!(signature.verify(prefixed, signer.address()).is_ok());
    }
}
