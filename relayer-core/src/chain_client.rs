//! Typed access to one JSON-RPC endpoint: block height, log queries,
//! signed transaction submission, and receipt polling.
//!
//! One `ChainClient` is constructed per chain (source, destination);
//! the two are otherwise identical, distinguished only by which role
//! the supervisor puts them in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, MiddlewareError, Provider, ProviderError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Filter, Log, TransactionRequest, TxHash, H256, U256, U64};

use crate::error::RelayerError;
use crate::types::LockEvent;

/// Receipt status for one awaited submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

pub struct Receipt {
    pub status: ReceiptStatus,
    pub block_height: u64,
}

/// A provider-imposed cap on the log query range. Some RPC providers
/// reject `eth_getLogs` ranges wider than their own limit with an
/// error rather than truncating silently; the scanner must shrink
/// the window and retry rather than drop events.
const PROVIDER_RANGE_CAP_HINT: &str = "query returned more than";

pub struct ChainClient {
    provider: Arc<Provider<Http>>,
    signer: Option<SignerMiddleware<Arc<Provider<Http>>, LocalWallet>>,
    signer_address: Option<Address>,
}

impl ChainClient {
    /// Construct a read-only client, used for the source chain (log
    /// scanning only, no transaction submission).
    pub fn new_readonly(rpc_url: &str) -> Result<Self, RelayerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RelayerError::Transport(format!("invalid RPC url {rpc_url}: {e}")))?;
        Ok(Self {
            provider: Arc::new(provider),
            signer: None,
            signer_address: None,
        })
    }

    /// Construct a client that can also sign and submit transactions,
    /// used for the destination chain.
    pub fn new_with_signer(rpc_url: &str, secret_key: &str) -> Result<Self, RelayerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RelayerError::Transport(format!("invalid RPC url {rpc_url}: {e}")))?;
        let provider = Arc::new(provider);

        let wallet: LocalWallet = secret_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| RelayerError::Fatal(format!("invalid signer secret key: {e}")))?;
        let signer_address = wallet.address();

        let signer = SignerMiddleware::new(provider.clone(), wallet);

        Ok(Self {
            provider,
            signer: Some(signer),
            signer_address: Some(signer_address),
        })
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    /// The chain's network identifier, used at startup to verify the
    /// relayer is pointed at the expected chain.
    pub async fn network_id(&self) -> Result<u64, RelayerError> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(map_provider_error)?;
        Ok(id.as_u64())
    }

    pub async fn current_head(&self) -> Result<u64, RelayerError> {
        let height: U64 = self
            .provider
            .get_block_number()
            .await
            .map_err(map_provider_error)?;
        Ok(height.as_u64())
    }

    /// Native gas balance held by the configured signer, used for the
    /// startup insufficient-funds warning.
    pub async fn signer_balance(&self) -> Result<U256, RelayerError> {
        let address = self
            .signer_address
            .ok_or_else(|| RelayerError::Fatal("client has no signer configured".into()))?;
        self.provider
            .get_balance(address, None)
            .await
            .map_err(map_provider_error)
    }

    /// Query `TokensLocked` logs over an inclusive block range, shrinking
    /// the window and retrying if the provider reports a range cap. The
    /// full `[from_block, to_block]` range is always covered: a cap only
    /// narrows the next sub-range queried, it never truncates the result.
    pub async fn query_logs(
        &self,
        contract: Address,
        topic0: H256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LockEvent>, RelayerError> {
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        let mut from = from_block;
        let mut window = to_block - from_block;

        loop {
            let hi = from.saturating_add(window).min(to_block);
            let filter = Filter::new()
                .address(contract)
                .topic0(topic0)
                .from_block(from)
                .to_block(hi);

            match self.provider.get_logs(&filter).await {
                Ok(logs) => {
                    events.extend(logs.iter().filter_map(|log| decode_lock_event(log).ok()));
                    if hi >= to_block {
                        events.sort_by_key(|e| (e.source_block, e.log_index));
                        return Ok(events);
                    }
                    from = hi + 1;
                    window = window.min(to_block - from);
                }
                Err(err) if is_range_cap_error(&err) && hi > from => {
                    window /= 2;
                }
                Err(err) => return Err(map_provider_error(err)),
            }
        }
    }

    /// Simulate, then broadcast, a `releaseTokens` call. The preflight
    /// `eth_call` is what surfaces the contract's revert reason string;
    /// a tx that is merely mined-and-reverted carries no string without
    /// tracing support, so the preflight is load-bearing, not optional.
    pub async fn submit_signed_call(
        &self,
        contract: Address,
        calldata: Bytes,
    ) -> Result<TxHash, RelayerError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| RelayerError::Fatal("client has no signer configured".into()))?;

        let tx = TransactionRequest::new().to(contract).data(calldata);

        if let Err(err) = self.provider.call(&tx.clone().into(), None).await {
            return Err(classify_middleware_error(&err));
        }

        let pending = signer
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify_middleware_error(&e))?;

        Ok(pending.tx_hash())
    }

    /// Block until the submission is mined or `timeout` elapses.
    pub async fn await_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, RelayerError> {
        let deadline = Instant::now() + timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(map_provider_error)?;

            if let Some(receipt) = receipt {
                let status = match receipt.status.map(|s| s.as_u64()) {
                    Some(1) => ReceiptStatus::Success,
                    _ => ReceiptStatus::Failure,
                };
                let block_height = receipt.block_number.map(|b| b.as_u64()).unwrap_or(0);
                return Ok(Receipt { status, block_height });
            }

            if Instant::now() >= deadline {
                return Err(RelayerError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

/// Decode one `TokensLocked(uint256,address,uint256)` log. Topic layout
/// per the external contract: topic[1] = sequence, topic[2] = recipient
/// (left-padded), topic[3] = amount. Data is empty.
fn decode_lock_event(log: &Log) -> Result<LockEvent, RelayerError> {
    if log.topics.len() < 4 {
        return Err(RelayerError::Fatal("log missing indexed topics".into()));
    }
    let sequence = U256::from_big_endian(log.topics[1].as_bytes());
    let recipient = Address::from(log.topics[2]);
    let amount = U256::from_big_endian(log.topics[3].as_bytes());

    let source_block = log
        .block_number
        .ok_or_else(|| RelayerError::Fatal("log missing block number".into()))?
        .as_u64();
    let source_tx = log
        .transaction_hash
        .ok_or_else(|| RelayerError::Fatal("log missing transaction hash".into()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| RelayerError::Fatal("log missing log index".into()))?
        .as_u64();

    Ok(LockEvent {
        sequence,
        recipient,
        amount,
        source_block,
        source_tx,
        log_index,
    })
}

fn is_range_cap_error(err: &ProviderError) -> bool {
    err.to_string()
        .to_lowercase()
        .contains(PROVIDER_RANGE_CAP_HINT)
}

fn map_provider_error(err: ProviderError) -> RelayerError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("rate limit") || lower.contains("too many requests") {
        RelayerError::ProviderRateLimit(msg)
    } else {
        RelayerError::Transport(msg)
    }
}

/// Classify any middleware-stack error (a preflight `eth_call` rejection
/// or a `send_transaction` broadcast failure) by its revert/error message.
/// A structured JSON-RPC error response is how real nodes report
/// insufficient-funds and nonce rejections, so the same substring checks
/// apply whether or not the error carries one — only the default classification
/// for an unrecognized message differs.
fn classify_middleware_error<E: MiddlewareError>(err: &E) -> RelayerError {
    if let Some(resp) = err.as_error_response() {
        return classify_message(&resp.message, RelayerError::PreflightRevert(resp.message.clone()));
    }
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    let default = if lower.contains("revert") {
        RelayerError::PreflightRevert(msg.clone())
    } else {
        RelayerError::Transport(msg.clone())
    };
    classify_message(&msg, default)
}

fn classify_message(msg: &str, default: RelayerError) -> RelayerError {
    let lower = msg.to_lowercase();
    if lower.contains("insufficient funds") {
        RelayerError::InsufficientFunds(msg.to_string())
    } else if lower.contains("nonce") {
        RelayerError::NonceConflict(msg.to_string())
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{JsonRpcError, RpcError};

    fn sample_log() -> Log {
        Log {
            topics: vec![
                H256::zero(),
                H256::from_low_u64_be(42),
                H256::from(Address::from_low_u64_be(0xabc)),
                H256::from_low_u64_be(1_000_000),
            ],
            block_number: Some(U64::from(7)),
            transaction_hash: Some(TxHash::from_low_u64_be(9)),
            log_index: Some(U256::from(3)),
            ..Default::default()
        }
    }

    #[test]
    fn decode_lock_event_reads_indexed_topics() {
        let event = decode_lock_event(&sample_log()).unwrap();
        assert_eq!(event.sequence, U256::from(42));
        assert_eq!(event.recipient, Address::from_low_u64_be(0xabc));
        assert_eq!(event.amount, U256::from(1_000_000));
        assert_eq!(event.source_block, 7);
        assert_eq!(event.log_index, 3);
    }

    #[test]
    fn decode_lock_event_rejects_missing_topics() {
        let mut log = sample_log();
        log.topics.truncate(2);
        assert!(decode_lock_event(&log).is_err());
    }

    #[test]
    fn decode_lock_event_rejects_missing_block_number() {
        let mut log = sample_log();
        log.block_number = None;
        assert!(decode_lock_event(&log).is_err());
    }

    #[test]
    fn range_cap_error_is_recognized_by_message() {
        let err = ProviderError::CustomError(
            "query returned more than 10000 results".to_string(),
        );
        assert!(is_range_cap_error(&err));

        let err = ProviderError::CustomError("connection refused".to_string());
        assert!(!is_range_cap_error(&err));
    }

    #[test]
    fn map_provider_error_recognizes_rate_limit() {
        let err = ProviderError::CustomError("429 too many requests".to_string());
        assert!(matches!(map_provider_error(err), RelayerError::ProviderRateLimit(_)));

        let err = ProviderError::CustomError("connection reset".to_string());
        assert!(matches!(map_provider_error(err), RelayerError::Transport(_)));
    }

    /// A minimal `RpcError` wrapping a structured JSON-RPC response, standing
    /// in for what a real node transport returns on a rejected call.
    #[derive(Debug)]
    struct FakeRpcError(JsonRpcError);

    impl std::fmt::Display for FakeRpcError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0.message)
        }
    }
    impl std::error::Error for FakeRpcError {}
    impl RpcError for FakeRpcError {
        fn as_error_response(&self) -> Option<&JsonRpcError> {
            Some(&self.0)
        }
        fn as_serde_error(&self) -> Option<&serde_json::Error> {
            None
        }
    }

    fn structured_error(message: &str) -> ProviderError {
        ProviderError::JsonRpcClientError(Box::new(FakeRpcError(JsonRpcError {
            code: 3,
            message: message.to_string(),
            data: None,
        })))
    }

    #[test]
    fn classify_middleware_error_reads_structured_insufficient_funds() {
        let err = structured_error("insufficient funds for gas * price + value");
        assert!(matches!(
            classify_middleware_error(&err),
            RelayerError::InsufficientFunds(_)
        ));
    }

    #[test]
    fn classify_middleware_error_reads_structured_nonce_conflict() {
        let err = structured_error("nonce too low");
        assert!(matches!(
            classify_middleware_error(&err),
            RelayerError::NonceConflict(_)
        ));
    }

    #[test]
    fn classify_middleware_error_defaults_structured_to_preflight_revert() {
        let err = structured_error("Bridge: Invalid signature.");
        match classify_middleware_error(&err) {
            RelayerError::PreflightRevert(msg) => assert_eq!(msg, "Bridge: Invalid signature."),
            other => panic!("expected PreflightRevert, got {other:?}"),
        }
    }

    #[test]
    fn classify_middleware_error_handles_unstructured_revert() {
        let err = ProviderError::CustomError("execution reverted: custom reason".to_string());
        assert!(matches!(
            classify_middleware_error(&err),
            RelayerError::PreflightRevert(_)
        ));
    }

    #[test]
    fn classify_middleware_error_defaults_unstructured_to_transport() {
        let err = ProviderError::CustomError("connection refused".to_string());
        assert!(matches!(classify_middleware_error(&err), RelayerError::Transport(_)));
    }
}
