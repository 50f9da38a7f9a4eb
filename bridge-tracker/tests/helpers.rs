//! Shared test helpers
//!
//! The module is organized into several categories:
//! - **Scripted Chain**: an in-memory `EvmRpc` whose head advances on a script
//! - **Log Builders**: `SentMessage`, relay and bridge event logs
//! - **Configuration Builders**: test configs and contexts

use async_trait::async_trait;
use bridge_tracker::events::{
    ERC20_BRIDGE_INITIATED, FAILED_RELAYED_MESSAGE, RELAYED_MESSAGE, SENT_MESSAGE,
};
use bridge_tracker::{BridgeContext, Config};
use chain_clients_evm::abi::{encode_address, encode_arguments, event_topic, Token};
use chain_clients_evm::{
    BlockTag, EvmError, EvmLog, EvmRpc, HexBytes, LogFilter, TransactionReceipt, H160, H256, U256,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

/// L2CrossDomainMessenger predeploy
pub const L2_MESSENGER: &str = "0x4200000000000000000000000000000000000007";

/// Sand Verse L1CrossDomainMessenger
pub const L1_MESSENGER: &str = "0xa04B03350eE9E3fdd1C2f63fAD5e0CabBb476594";

pub fn addr(s: &str) -> H160 {
    chain_clients_evm::abi::parse_address(s).unwrap()
}

pub fn l2_messenger() -> H160 {
    addr(L2_MESSENGER)
}

pub fn l1_messenger() -> H160 {
    addr(L1_MESSENGER)
}

pub fn tx(n: u8) -> H256 {
    H256::repeat_byte(n)
}

// ============================================================================
// SCRIPTED CHAIN
// ============================================================================

/// In-memory chain. `eth_blockNumber` walks through `heads`, repeating the
/// last entry; `eth_getLogs` filters the stored logs like a node would.
#[derive(Default)]
pub struct ScriptedChain {
    heads: Mutex<VecDeque<u64>>,
    logs: Mutex<Vec<EvmLog>>,
    receipts: Mutex<HashMap<H256, TransactionReceipt>>,
    balances: Mutex<HashMap<H160, U256>>,
    call_results: Mutex<HashMap<H160, Vec<u8>>>,
    log_errors: Mutex<VecDeque<EvmError>>,
    receipt_errors: Mutex<VecDeque<EvmError>>,
    log_delay: Mutex<Option<Duration>>,
    queries: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedChain {
    pub fn new(heads: &[u64]) -> Arc<Self> {
        let chain = Self::default();
        *chain.heads.lock().unwrap() = heads.iter().copied().collect();
        Arc::new(chain)
    }

    pub fn set_heads(&self, heads: &[u64]) {
        *self.heads.lock().unwrap() = heads.iter().copied().collect();
    }

    pub fn add_log(&self, log: EvmLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn add_receipt(&self, receipt: TransactionReceipt) {
        self.receipts
            .lock()
            .unwrap()
            .insert(receipt.transaction_hash, receipt);
    }

    /// Adds a relay event log plus the receipt of the transaction that emitted it.
    pub fn add_relay(&self, contract: H160, msg_hash: H256, block: u64, tx_hash: H256, failed: bool) {
        let log = relay_log(contract, msg_hash, block, tx_hash, failed);
        self.add_receipt(receipt(tx_hash, block, vec![log.clone()]));
        self.add_log(log);
    }

    pub fn set_balance(&self, account: H160, value: U256) {
        self.balances.lock().unwrap().insert(account, value);
    }

    pub fn set_call_result(&self, to: H160, output: Vec<u8>) {
        self.call_results.lock().unwrap().insert(to, output);
    }

    /// Makes the next `eth_getLogs` calls fail with these errors, in order.
    pub fn fail_next_log_queries(&self, errors: Vec<EvmError>) {
        self.log_errors.lock().unwrap().extend(errors);
    }

    /// Makes the next `eth_getTransactionReceipt` calls fail with these errors, in order.
    pub fn fail_next_receipt_queries(&self, errors: Vec<EvmError>) {
        self.receipt_errors.lock().unwrap().extend(errors);
    }

    /// Delays every `eth_getLogs` response.
    pub fn delay_log_queries(&self, delay: Duration) {
        *self.log_delay.lock().unwrap() = Some(delay);
    }

    /// Block ranges passed to successful `eth_getLogs` calls.
    pub fn queries(&self) -> Vec<(u64, u64)> {
        self.queries.lock().unwrap().clone()
    }

    fn current_head(&self) -> u64 {
        let mut heads = self.heads.lock().unwrap();
        if heads.len() > 1 {
            heads.pop_front().unwrap()
        } else {
            heads.front().copied().unwrap_or(0)
        }
    }

    fn latest(&self) -> u64 {
        self.heads.lock().unwrap().front().copied().unwrap_or(0)
    }
}

fn block_of(tag: BlockTag, latest: u64) -> u64 {
    match tag {
        BlockTag::Number(n) => n,
        BlockTag::Latest => latest,
    }
}

fn filter_matches(filter: &LogFilter, log: &EvmLog, from: u64, to: u64) -> bool {
    if log.address != filter.address {
        return false;
    }
    let block = log.block().unwrap_or(0);
    if block < from || block > to {
        return false;
    }
    filter.topics.iter().enumerate().all(|(i, position)| match position {
        None => true,
        Some(values) => log.topics.get(i).map(|t| values.contains(t)).unwrap_or(false),
    })
}

#[async_trait]
impl EvmRpc for ScriptedChain {
    async fn block_number(&self) -> Result<u64, EvmError> {
        Ok(self.current_head())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<EvmLog>, EvmError> {
        let delay = *self.log_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self.log_errors.lock().unwrap().pop_front();
        if let Some(err) = injected {
            return Err(err);
        }

        let latest = self.latest();
        let from = block_of(filter.from_block, latest);
        let to = block_of(filter.to_block, latest);
        self.queries.lock().unwrap().push((from, to));

        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| filter_matches(filter, log, from, to))
            .cloned()
            .collect())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, EvmError> {
        let injected = self.receipt_errors.lock().unwrap().pop_front();
        if let Some(err) = injected {
            return Err(err);
        }
        Ok(self.receipts.lock().unwrap().get(&tx_hash).cloned())
    }

    async fn balance(&self, address: H160) -> Result<U256, EvmError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn call(&self, to: H160, _data: Vec<u8>) -> Result<Vec<u8>, EvmError> {
        Ok(self
            .call_results
            .lock()
            .unwrap()
            .get(&to)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn transport_error() -> EvmError {
    EvmError::Transport {
        method: "eth_getLogs".to_string(),
        message: "connection reset by peer".to_string(),
    }
}

pub fn rpc_error(message: &str) -> EvmError {
    EvmError::Rpc {
        method: "eth_getLogs".to_string(),
        code: -32000,
        message: message.to_string(),
    }
}

// ============================================================================
// LOG BUILDERS
// ============================================================================

pub fn address_topic(address: &H160) -> H256 {
    H256::from(encode_address(address))
}

/// `SentMessage(address indexed target, address sender, bytes message, uint256 messageNonce, uint256 gasLimit)`
pub fn sent_message_log(
    messenger: H160,
    target: H160,
    sender: H160,
    message: &[u8],
    nonce: U256,
    gas_limit: U256,
) -> EvmLog {
    EvmLog {
        address: messenger,
        topics: vec![event_topic(SENT_MESSAGE), address_topic(&target)],
        data: HexBytes(encode_arguments(&[
            Token::Address(sender),
            Token::Bytes(message.to_vec()),
            Token::Uint(nonce),
            Token::Uint(gas_limit),
        ])),
        block_number: Some(10u64.into()),
        transaction_hash: Some(tx(0xee)),
        log_index: Some(0u64.into()),
    }
}

/// A log from an unrelated contract event
pub fn unrelated_log(address: H160) -> EvmLog {
    EvmLog {
        address,
        topics: vec![
            event_topic("Transfer(address,address,uint256)"),
            address_topic(&H160::zero()),
            address_topic(&H160::repeat_byte(0xaa)),
        ],
        data: HexBytes(encode_arguments(&[Token::Uint(U256::from(5u64))])),
        block_number: Some(10u64.into()),
        transaction_hash: Some(tx(0xee)),
        log_index: Some(0u64.into()),
    }
}

pub fn relay_log(contract: H160, msg_hash: H256, block: u64, tx_hash: H256, failed: bool) -> EvmLog {
    let signature = if failed {
        FAILED_RELAYED_MESSAGE
    } else {
        RELAYED_MESSAGE
    };
    EvmLog {
        address: contract,
        topics: vec![event_topic(signature), msg_hash],
        data: HexBytes::default(),
        block_number: Some(block.into()),
        transaction_hash: Some(tx_hash),
        log_index: Some(0u64.into()),
    }
}

/// `ERC20BridgeInitiated(localToken, remoteToken, from, to, amount, extraData)`
#[allow(clippy::too_many_arguments)]
pub fn erc20_bridge_log(
    bridge: H160,
    local_token: H160,
    remote_token: H160,
    from: H160,
    to: H160,
    amount: u64,
    block: u64,
    tx_hash: H256,
) -> EvmLog {
    EvmLog {
        address: bridge,
        topics: vec![
            event_topic(ERC20_BRIDGE_INITIATED),
            address_topic(&local_token),
            address_topic(&remote_token),
            address_topic(&from),
        ],
        data: HexBytes(encode_arguments(&[
            Token::Address(to),
            Token::Uint(U256::from(amount)),
            Token::Bytes(vec![]),
        ])),
        block_number: Some(block.into()),
        transaction_hash: Some(tx_hash),
        log_index: Some(1u64.into()),
    }
}

pub fn receipt(tx_hash: H256, block: u64, logs: Vec<EvmLog>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash,
        block_number: block.into(),
        from: None,
        to: None,
        gas_used: U256::from(21_000u64),
        effective_gas_price: Some(U256::from(1_000_000_000u64)),
        status: Some(1u64.into()),
        logs,
    }
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Default config with short watcher timings for tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.hub_chain.rpc_url = "http://127.0.0.1:8545".to_string();
    config.verse_chain.rpc_url = "http://127.0.0.1:18545".to_string();
    config.watcher.polling_interval_ms = 1_000;
    config.watcher.retry_attempts = 3;
    config.watcher.retry_delay_ms = 500;
    config
}

pub fn test_context(hub: Arc<ScriptedChain>, verse: Arc<ScriptedChain>) -> BridgeContext {
    BridgeContext::with_clients(&test_config(), hub, verse).unwrap()
}
