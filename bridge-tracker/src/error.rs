//! Tracker error taxonomy

use chain_clients_evm::{AbiError, EvmError, H256, U256};
use thiserror::Error;

/// Node error messages treated as transient when no list is configured.
///
/// Hub nodes answer with `index out of bounds` while the output a withdrawal
/// relay depends on has not been proposed yet.
pub const DEFAULT_TRANSIENT_MARKERS: &[&str] = &["index out of bounds"];

/// [`DEFAULT_TRANSIENT_MARKERS`] as owned strings.
pub fn default_transient_markers() -> Vec<String> {
    DEFAULT_TRANSIENT_MARKERS.iter().map(|m| m.to_string()).collect()
}

/// Errors raised while correlating and confirming cross-domain messages
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The expected event is absent from a receipt or log set
    #[error("event {event} not found in receipt")]
    EventNotFound { event: &'static str },

    /// A nonce version was requested for encoding that the codec does not implement
    #[error("unsupported nonce version {0}")]
    UnsupportedVersion(U256),

    /// A nonce read from chain carries a version the message codec does not implement
    #[error("unknown message version {0}")]
    UnknownVersion(U256),

    /// Version 1 messages need both value and gas limit
    #[error("version 1 message requires both value and gas limit")]
    MissingValueOrGasLimit,

    /// A sequence number does not fit in the low 240 bits
    #[error("nonce sequence {0} does not fit in 240 bits")]
    SequenceOutOfRange(U256),

    /// More than one relay event carries the same message hash
    #[error("{count} relay events match message hash {msg_hash:#x}")]
    MultipleMatchesFound { msg_hash: H256, count: usize },

    /// A bounded scan finished its window without a match
    #[error("no relay event for {msg_hash:#x} in blocks {from_block}..={to_block}")]
    RelayNotFound {
        msg_hash: H256,
        from_block: u64,
        to_block: u64,
    },

    /// A receipt for the given transaction is not available
    #[error("transaction receipt {0:#x} not found")]
    ReceiptNotFound(H256),

    /// An event log did not match its declared schema
    #[error("malformed {event} log: {reason}")]
    MalformedLog { event: &'static str, reason: String },

    /// Network failure or a node error known to clear up on its own
    #[error("transient RPC error: {0}")]
    TransientRpc(#[source] EvmError),

    /// Node error that retrying will not fix
    #[error("RPC error: {0}")]
    Rpc(#[source] EvmError),

    /// A contract needed by the operation has no configured address
    #[error("{0} address is not configured")]
    NotConfigured(&'static str),

    /// The watch was stopped through its handle
    #[error("watch for {0:#x} was cancelled")]
    WatchCancelled(H256),

    /// A bounded watch used up its poll budget
    #[error("watch for {msg_hash:#x} gave up after {polls} polls")]
    WatchTimedOut { msg_hash: H256, polls: u32 },

    /// Retry loop gave up; carries the last underlying error
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<TrackerError>,
    },
}

impl TrackerError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TrackerError::TransientRpc(_))
    }

    /// Classifies a chain client error. Transport failures and node messages
    /// containing one of `transient_markers` are transient; anything else is terminal.
    pub fn from_rpc(err: EvmError, transient_markers: &[String]) -> Self {
        if err.is_transport() {
            return TrackerError::TransientRpc(err);
        }
        let transient = err
            .rpc_message()
            .map(|message| {
                transient_markers
                    .iter()
                    .any(|marker| message.contains(marker.as_str()))
            })
            .unwrap_or(false);
        if transient {
            TrackerError::TransientRpc(err)
        } else {
            TrackerError::Rpc(err)
        }
    }

    pub(crate) fn malformed(event: &'static str, err: AbiError) -> Self {
        TrackerError::MalformedLog {
            event,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
