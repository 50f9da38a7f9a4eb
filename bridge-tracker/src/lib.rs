//! Bridge Tracker Library
//!
//! Correlates cross-domain messages sent between a Hub-Layer and a Verse-Layer
//! with the relay events the destination messenger emits, and waits for those
//! relays to land.

pub mod bridge_messages;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod messenger;
pub mod reporter;
pub mod tracker;
pub mod watcher;

// Re-export commonly used types
pub use config::{Config, HubChainConfig, VerseChainConfig, WatcherConfig};
pub use context::{BridgeContext, Chain};
pub use error::TrackerError;
pub use events::{RelayEvent, RelayStatus, SentMessage, TokenStandard};
pub use messenger::{derive_message_hash, derive_message_hashes, CrossDomainMessage, VersionedNonce};
pub use reporter::{Asset, BalanceReporter};
pub use tracker::{BridgeTracker, Direction, RelayRequest, WaitStrategy};
pub use watcher::{
    scan_for_relay, watch_for_relay, RelayOutcome, RelayWatcher, RetryPolicy, WatchHandle,
    WatchOptions,
};
