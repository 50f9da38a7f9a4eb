//! Bridge Tracker Module
//!
//! Direction-aware entry points: fetch the source receipt, derive the message
//! hash and wait for the relay on the other chain.

use chain_clients_evm::{TransactionReceipt, H256, U256};
use futures::future::join_all;
use tracing::info;

use crate::context::{BridgeContext, Chain};
use crate::error::{Result, TrackerError};
use crate::messenger::derive_message_hash_from;
use crate::watcher::{RelayOutcome, RelayWatcher, RetryPolicy, WatchOptions};

/// Which way a message is travelling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Hub-Layer to Verse-Layer
    Deposit,
    /// Verse-Layer to Hub-Layer
    Withdrawal,
}

impl Direction {
    pub fn source(&self) -> Chain {
        match self {
            Direction::Deposit => Chain::Hub,
            Direction::Withdrawal => Chain::Verse,
        }
    }

    pub fn destination(&self) -> Chain {
        match self {
            Direction::Deposit => Chain::Verse,
            Direction::Withdrawal => Chain::Hub,
        }
    }
}

/// How to wait for the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Poll from a cursor until the relay lands
    Poll(WatchOptions),
    /// Repeat bounded look-back scans under the configured retry policy
    Scan,
}

/// One bridge transaction to confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRequest {
    pub direction: Direction,
    /// Source chain transaction that sent the message
    pub tx_hash: H256,
    /// Native value sent with the message
    pub value: U256,
}

/// Confirms bridge messages between the Hub and Verse of one [`BridgeContext`]
pub struct BridgeTracker {
    ctx: BridgeContext,
}

impl BridgeTracker {
    pub fn new(ctx: BridgeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    /// Watcher on the Verse-Layer L2CrossDomainMessenger.
    pub fn deposit_watcher(&self) -> RelayWatcher {
        RelayWatcher::new(
            self.ctx.verse.clone(),
            self.ctx.verse_addresses.cross_domain_messenger,
        )
        .with_transient_markers(self.ctx.watcher.transient_error_markers.clone())
    }

    /// Watcher on the Hub-Layer L1CrossDomainMessenger.
    pub fn withdrawal_watcher(&self) -> RelayWatcher {
        RelayWatcher::new(
            self.ctx.hub.clone(),
            self.ctx.hub_addresses.cross_domain_messenger,
        )
        .with_transient_markers(self.ctx.watcher.transient_error_markers.clone())
    }

    fn watcher(&self, direction: Direction) -> RelayWatcher {
        match direction {
            Direction::Deposit => self.deposit_watcher(),
            Direction::Withdrawal => self.withdrawal_watcher(),
        }
    }

    /// Polling options from the configured interval and error budget.
    pub fn default_watch_options(&self) -> WatchOptions {
        WatchOptions {
            polling_interval: self.ctx.watcher.polling_interval(),
            max_consecutive_errors: self.ctx.watcher.retry_attempts,
            ..WatchOptions::default()
        }
    }

    /// Receipt of a transaction on `chain`.
    pub async fn receipt(&self, chain: Chain, tx_hash: H256) -> Result<TransactionReceipt> {
        self.ctx
            .client(chain)
            .transaction_receipt(tx_hash)
            .await
            .map_err(|e| TrackerError::from_rpc(e, &self.ctx.watcher.transient_error_markers))?
            .ok_or(TrackerError::ReceiptNotFound(tx_hash))
    }

    /// Message hash of the first message the source messenger sent in `tx_hash`.
    pub async fn message_hash(
        &self,
        direction: Direction,
        tx_hash: H256,
        value: U256,
    ) -> Result<H256> {
        let receipt = self.receipt(direction.source(), tx_hash).await?;
        let messenger = match direction {
            Direction::Deposit => self.ctx.hub_addresses.cross_domain_messenger,
            Direction::Withdrawal => self.ctx.verse_addresses.cross_domain_messenger,
        };
        derive_message_hash_from(&receipt, &messenger, value)
    }

    /// Waits for a Hub-to-Verse message sent in `tx_hash` to be relayed.
    pub async fn wait_for_deposit_relay(
        &self,
        tx_hash: H256,
        value: U256,
        strategy: WaitStrategy,
    ) -> Result<RelayOutcome> {
        self.wait_for_relay(
            RelayRequest {
                direction: Direction::Deposit,
                tx_hash,
                value,
            },
            strategy,
        )
        .await
    }

    /// Waits for a Verse-to-Hub message sent in `tx_hash` to be relayed.
    pub async fn wait_for_withdrawal_relay(
        &self,
        tx_hash: H256,
        value: U256,
        strategy: WaitStrategy,
    ) -> Result<RelayOutcome> {
        self.wait_for_relay(
            RelayRequest {
                direction: Direction::Withdrawal,
                tx_hash,
                value,
            },
            strategy,
        )
        .await
    }

    pub async fn wait_for_relay(
        &self,
        request: RelayRequest,
        strategy: WaitStrategy,
    ) -> Result<RelayOutcome> {
        let msg_hash = self
            .message_hash(request.direction, request.tx_hash, request.value)
            .await?;
        info!(
            direction = ?request.direction,
            tx_hash = %format!("{:#x}", request.tx_hash),
            msg_hash = %format!("{:#x}", msg_hash),
            "Waiting for relay"
        );

        let watcher = self.watcher(request.direction);
        match strategy {
            WaitStrategy::Poll(options) => watcher.watch(msg_hash, options).outcome().await,
            WaitStrategy::Scan => {
                watcher
                    .scan_until_found(
                        msg_hash,
                        self.ctx.watcher.scan_look_back_blocks,
                        RetryPolicy::from(&self.ctx.watcher),
                    )
                    .await
            }
        }
    }

    /// Confirms several bridge transactions concurrently, one independent
    /// watcher each. Results are returned in request order.
    pub async fn confirm_many(
        &self,
        requests: &[RelayRequest],
        strategy: WaitStrategy,
    ) -> Vec<Result<RelayOutcome>> {
        join_all(
            requests
                .iter()
                .map(|request| self.wait_for_relay(*request, strategy.clone())),
        )
        .await
    }
}
