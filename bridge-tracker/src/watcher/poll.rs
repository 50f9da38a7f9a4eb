//! Indefinite relay watch.
//!
//! A [`RelayPoller`] owns a block cursor. Each poll scans `[cursor, head]` and
//! moves the cursor to `head + 1`, so consecutive windows neither overlap nor
//! leave gaps. Polls that see no new block do not query logs.

use chain_clients_evm::H256;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::{RelayOutcome, RelayWatcher};
use crate::error::{Result, TrackerError};
use crate::events::RelayEvent;

/// Settings for [`RelayWatcher::watch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Pause between polls
    pub polling_interval: Duration,
    /// First block to scan; defaults to the block after the head at start
    pub from_block: Option<u64>,
    /// Give up with `WatchTimedOut` after this many polls; `None` polls forever
    pub max_polls: Option<u32>,
    /// Consecutive transient RPC failures tolerated before giving up
    pub max_consecutive_errors: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(30),
            from_block: None,
            max_polls: None,
            max_consecutive_errors: 10,
        }
    }
}

/// What one poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Cursor initialized from the head; nothing scanned yet
    Started { next_block: u64 },
    /// Head has not moved past the cursor
    NoNewBlocks { next_block: u64 },
    /// `[from_block, to_block]` was scanned
    Scanned {
        from_block: u64,
        to_block: u64,
        matched: Option<RelayEvent>,
    },
}

/// Cursor-driven scanner for one message hash
pub struct RelayPoller {
    watcher: RelayWatcher,
    msg_hash: H256,
    next_block: Option<u64>,
}

impl RelayPoller {
    pub fn new(watcher: RelayWatcher, msg_hash: H256, from_block: Option<u64>) -> Self {
        Self {
            watcher,
            msg_hash,
            next_block: from_block,
        }
    }

    /// Next block the poller will scan, once known.
    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    /// Runs one poll. On error the cursor is left untouched so the same
    /// window is retried.
    pub async fn poll(&mut self) -> Result<PollStep> {
        let head = self.watcher.head().await?;

        let from_block = match self.next_block {
            Some(block) => block,
            None => {
                let next_block = head.saturating_add(1);
                self.next_block = Some(next_block);
                return Ok(PollStep::Started { next_block });
            }
        };

        if head < from_block {
            return Ok(PollStep::NoNewBlocks {
                next_block: from_block,
            });
        }

        let matched = self
            .watcher
            .find_in_range(self.msg_hash, from_block, head)
            .await?;
        self.next_block = Some(head.saturating_add(1));

        debug!(
            msg_hash = %format!("{:#x}", self.msg_hash),
            from_block,
            to_block = head,
            matched = matched.is_some(),
            "Scanned for relay"
        );

        Ok(PollStep::Scanned {
            from_block,
            to_block: head,
            matched,
        })
    }
}

/// Running watch started by [`RelayWatcher::watch`]
///
/// Dropping the handle cancels the watch.
pub struct WatchHandle {
    msg_hash: H256,
    cancel: CancellationToken,
    task: JoinHandle<Result<RelayOutcome>>,
    _guard: DropGuard,
}

impl WatchHandle {
    pub fn msg_hash(&self) -> H256 {
        self.msg_hash
    }

    /// Stops the watch. An in-flight RPC call is allowed to finish but its
    /// result is dropped, and [`WatchHandle::outcome`] returns `WatchCancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this watch when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the watch to finish.
    pub async fn outcome(self) -> Result<RelayOutcome> {
        match self.task.await {
            Ok(result) => result,
            // Task aborted or panicked
            Err(_) => Err(TrackerError::WatchCancelled(self.msg_hash)),
        }
    }
}

impl RelayWatcher {
    /// Spawns a watch for `msg_hash` and returns a handle to await or cancel it.
    pub fn watch(&self, msg_hash: H256, options: WatchOptions) -> WatchHandle {
        let cancel = CancellationToken::new();
        let watcher = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { watcher.watch_until(msg_hash, options, token).await });
        WatchHandle {
            msg_hash,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// Polls until the relay event for `msg_hash` appears, `cancel` fires, or a
    /// terminal error occurs.
    pub async fn watch_until(
        &self,
        msg_hash: H256,
        options: WatchOptions,
        cancel: CancellationToken,
    ) -> Result<RelayOutcome> {
        info!(
            msg_hash = %format!("{:#x}", msg_hash),
            contract = %format!("{:#x}", self.contract),
            from_block = ?options.from_block,
            "Watching for relay every {:?}",
            options.polling_interval
        );

        let mut poller = RelayPoller::new(self.clone(), msg_hash, options.from_block);
        let mut polls: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        // Set once a relay log is seen; the cursor has already moved past it.
        let mut matched: Option<RelayEvent> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(TrackerError::WatchCancelled(msg_hash));
            }

            if matched.is_none() {
                if let Some(max_polls) = options.max_polls {
                    if polls >= max_polls {
                        return Err(TrackerError::WatchTimedOut { msg_hash, polls });
                    }
                }
                polls += 1;

                let step = tokio::select! {
                    _ = cancel.cancelled() => return Err(TrackerError::WatchCancelled(msg_hash)),
                    step = poller.poll() => step,
                };
                match step {
                    Ok(PollStep::Scanned {
                        matched: Some(event),
                        ..
                    }) => matched = Some(event),
                    Ok(_) => consecutive_errors = 0,
                    Err(e) => {
                        consecutive_errors = self.tolerate(msg_hash, e, consecutive_errors, &options)?
                    }
                }
            }

            if let Some(event) = matched.clone() {
                let resolved = tokio::select! {
                    _ = cancel.cancelled() => return Err(TrackerError::WatchCancelled(msg_hash)),
                    resolved = self.resolve(event) => resolved,
                };
                match resolved {
                    Ok(outcome) => {
                        info!(
                            msg_hash = %format!("{:#x}", msg_hash),
                            tx_hash = %format!("{:#x}", outcome.transaction_hash()),
                            relayed = outcome.is_relayed(),
                            "Relay found"
                        );
                        return Ok(outcome);
                    }
                    Err(e) => {
                        consecutive_errors = self.tolerate(msg_hash, e, consecutive_errors, &options)?
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(TrackerError::WatchCancelled(msg_hash)),
                _ = tokio::time::sleep(options.polling_interval) => {}
            }
        }
    }

    /// Counts a failed poll or receipt lookup against the error budget.
    /// Returns the new consecutive error count, or the error once it is
    /// terminal or the budget is spent.
    fn tolerate(
        &self,
        msg_hash: H256,
        err: TrackerError,
        consecutive_errors: u32,
        options: &WatchOptions,
    ) -> Result<u32> {
        if !is_retryable_watch_error(&err) {
            return Err(err);
        }
        let consecutive_errors = consecutive_errors + 1;
        if consecutive_errors > options.max_consecutive_errors {
            return Err(TrackerError::RetriesExhausted {
                attempts: consecutive_errors,
                last: Box::new(err),
            });
        }
        warn!(
            msg_hash = %format!("{:#x}", msg_hash),
            attempt = consecutive_errors,
            error = %err,
            "Transient error while watching for relay"
        );
        Ok(consecutive_errors)
    }
}

/// A node may serve a relay log before the receipt of its transaction.
fn is_retryable_watch_error(err: &TrackerError) -> bool {
    err.is_transient() || matches!(err, TrackerError::ReceiptNotFound(_))
}
