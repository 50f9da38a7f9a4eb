//! Relay Watcher Module
//!
//! Finds the `RelayedMessage` / `FailedRelayedMessage` event carrying a message
//! hash on the destination chain. Two strategies are provided:
//!
//! - [`RelayWatcher::scan`]: one query over a fixed window behind the head
//! - [`RelayWatcher::watch`]: polling from a cursor until the event shows up,
//!   scanning each block exactly once

use chain_clients_evm::{
    BlockTag, EvmError, EvmLog, EvmRpc, LogFilter, TransactionReceipt, H160, H256, U256,
};
use std::sync::Arc;

use crate::error::{default_transient_markers, Result, TrackerError};
use crate::events::{EventSchema, RelayEvent, RelayStatus};
use crate::messenger::derive_message_hash;

pub mod poll;
pub mod retry;
pub mod scan;

pub use poll::{PollStep, RelayPoller, WatchHandle, WatchOptions};
pub use retry::RetryPolicy;

/// Terminal result of a watch or scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The relayed call succeeded
    Relayed {
        msg_hash: H256,
        receipt: TransactionReceipt,
    },
    /// The relayed call reverted on the destination chain
    FailedRelay {
        msg_hash: H256,
        receipt: TransactionReceipt,
    },
}

impl RelayOutcome {
    pub fn msg_hash(&self) -> H256 {
        match self {
            RelayOutcome::Relayed { msg_hash, .. } | RelayOutcome::FailedRelay { msg_hash, .. } => {
                *msg_hash
            }
        }
    }

    pub fn receipt(&self) -> &TransactionReceipt {
        match self {
            RelayOutcome::Relayed { receipt, .. } | RelayOutcome::FailedRelay { receipt, .. } => {
                receipt
            }
        }
    }

    /// Destination transaction that emitted the relay event.
    pub fn transaction_hash(&self) -> H256 {
        self.receipt().transaction_hash
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self, RelayOutcome::Relayed { .. })
    }
}

/// Watches one messenger contract on the destination chain
#[derive(Clone)]
pub struct RelayWatcher {
    client: Arc<dyn EvmRpc>,
    contract: H160,
    transient_markers: Arc<Vec<String>>,
}

impl RelayWatcher {
    /// Uses [`crate::error::DEFAULT_TRANSIENT_MARKERS`] until
    /// [`RelayWatcher::with_transient_markers`] replaces them.
    pub fn new(client: Arc<dyn EvmRpc>, contract: H160) -> Self {
        Self {
            client,
            contract,
            transient_markers: Arc::new(default_transient_markers()),
        }
    }

    /// Node error messages that should be treated as transient.
    pub fn with_transient_markers(mut self, markers: Vec<String>) -> Self {
        self.transient_markers = Arc::new(markers);
        self
    }

    pub fn contract(&self) -> H160 {
        self.contract
    }

    pub(crate) fn classify(&self, err: EvmError) -> TrackerError {
        TrackerError::from_rpc(err, &self.transient_markers)
    }

    pub(crate) async fn head(&self) -> Result<u64> {
        self.client
            .block_number()
            .await
            .map_err(|e| self.classify(e))
    }

    /// Queries relay events for `msg_hash` in `[from_block, to_block]` and
    /// returns the single match, if any.
    pub(crate) async fn find_in_range(
        &self,
        msg_hash: H256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Option<RelayEvent>> {
        let filter = relay_filter(self.contract, msg_hash, from_block, to_block);
        let logs = self
            .client
            .get_logs(&filter)
            .await
            .map_err(|e| self.classify(e))?;
        single_match(&logs, msg_hash)
    }

    /// Fetches the destination receipt for a matched event.
    pub(crate) async fn resolve(&self, event: RelayEvent) -> Result<RelayOutcome> {
        let tx_hash = event.transaction_hash.ok_or(TrackerError::MalformedLog {
            event: RelayEvent::NAME,
            reason: "log has no transaction hash".to_string(),
        })?;
        let receipt = self
            .client
            .transaction_receipt(tx_hash)
            .await
            .map_err(|e| self.classify(e))?
            .ok_or(TrackerError::ReceiptNotFound(tx_hash))?;

        Ok(match event.status {
            RelayStatus::Relayed => RelayOutcome::Relayed {
                msg_hash: event.msg_hash,
                receipt,
            },
            RelayStatus::Failed => RelayOutcome::FailedRelay {
                msg_hash: event.msg_hash,
                receipt,
            },
        })
    }
}

/// Derives the message hash from a source receipt and starts an indefinite
/// watch for its relay on `contract`.
pub fn watch_for_relay(
    client: Arc<dyn EvmRpc>,
    contract: H160,
    receipt: &TransactionReceipt,
    value: U256,
    options: WatchOptions,
) -> Result<WatchHandle> {
    let msg_hash = derive_message_hash(receipt, value)?;
    Ok(RelayWatcher::new(client, contract).watch(msg_hash, options))
}

/// One bounded scan for the relay of `msg_hash`.
pub async fn scan_for_relay(
    client: Arc<dyn EvmRpc>,
    contract: H160,
    msg_hash: H256,
    look_back: u64,
) -> Result<RelayOutcome> {
    RelayWatcher::new(client, contract)
        .scan(msg_hash, look_back)
        .await
}

/// `eth_getLogs` filter for either relay event carrying `msg_hash`.
pub fn relay_filter(contract: H160, msg_hash: H256, from_block: u64, to_block: u64) -> LogFilter {
    LogFilter::new(contract)
        .topic(RelayEvent::topics())
        .topic(vec![msg_hash])
        .from_block(from_block)
        .to_block(BlockTag::Number(to_block))
}

/// Picks the relay event for `msg_hash` out of `logs`.
///
/// Logs for other hashes are ignored. More than one match is an error: message
/// hashes are unique per message, so a duplicate is never resolved by choosing.
pub fn single_match(logs: &[EvmLog], msg_hash: H256) -> Result<Option<RelayEvent>> {
    let mut matches = Vec::new();
    for log in logs {
        if !log.signature().map(RelayEvent::matches).unwrap_or(false) {
            continue;
        }
        let event = RelayEvent::decode(log)?;
        if event.msg_hash == msg_hash {
            matches.push(event);
        }
    }

    if matches.len() > 1 {
        tracing::error!(
            msg_hash = %format!("{:#x}", msg_hash),
            count = matches.len(),
            "Multiple relay events for one message hash"
        );
        return Err(TrackerError::MultipleMatchesFound {
            msg_hash,
            count: matches.len(),
        });
    }
    Ok(matches.pop())
}
