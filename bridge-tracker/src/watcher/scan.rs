//! Bounded relay scans.

use chain_clients_evm::H256;
use tracing::{debug, info};

use super::retry::{retry, RetryPolicy};
use super::{RelayOutcome, RelayWatcher};
use crate::error::{Result, TrackerError};

impl RelayWatcher {
    /// Single query over `[max(head - look_back, 0), head]`.
    ///
    /// # Returns
    ///
    /// * `Ok(RelayOutcome)` - Exactly one relay event in the window
    /// * `Err(TrackerError::RelayNotFound)` - No relay event in the window
    /// * `Err(TrackerError::MultipleMatchesFound)` - More than one relay event
    pub async fn scan(&self, msg_hash: H256, look_back: u64) -> Result<RelayOutcome> {
        let to_block = self.head().await?;
        let from_block = to_block.saturating_sub(look_back);

        debug!(
            msg_hash = %format!("{:#x}", msg_hash),
            from_block,
            to_block,
            "Scanning for relay"
        );

        match self.find_in_range(msg_hash, from_block, to_block).await? {
            Some(event) => self.resolve(event).await,
            None => Err(TrackerError::RelayNotFound {
                msg_hash,
                from_block,
                to_block,
            }),
        }
    }

    /// Repeats [`RelayWatcher::scan`] until it finds the relay.
    ///
    /// `RelayNotFound` and transient RPC failures are retried after
    /// `policy.delay`; any other error ends the loop immediately.
    pub async fn scan_until_found(
        &self,
        msg_hash: H256,
        look_back: u64,
        policy: RetryPolicy,
    ) -> Result<RelayOutcome> {
        let outcome = retry(policy, is_retryable_scan_error, |attempt| {
            debug!(msg_hash = %format!("{:#x}", msg_hash), attempt, "Relay scan attempt");
            self.scan(msg_hash, look_back)
        })
        .await?;

        info!(
            msg_hash = %format!("{:#x}", msg_hash),
            tx_hash = %format!("{:#x}", outcome.transaction_hash()),
            relayed = outcome.is_relayed(),
            "Relay found"
        );
        Ok(outcome)
    }
}

fn is_retryable_scan_error(err: &TrackerError) -> bool {
    err.is_transient() || matches!(err, TrackerError::RelayNotFound { .. })
}
