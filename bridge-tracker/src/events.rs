//! Event Schemas Module
//!
//! Typed decoders for the messenger and bridge events. Each schema checks the
//! topic count and data layout when decoding, so an unexpected log shape is
//! reported as `MalformedLog` instead of being misread.

use chain_clients_evm::abi::{event_topic, read_address, read_bytes, read_uint, topic_to_address};
use chain_clients_evm::{EvmLog, H160, H256, U256};

use crate::error::{Result, TrackerError};

// ============================================================================
// EVENT SIGNATURES
// ============================================================================

pub const SENT_MESSAGE: &str = "SentMessage(address,address,bytes,uint256,uint256)";
pub const RELAYED_MESSAGE: &str = "RelayedMessage(bytes32)";
pub const FAILED_RELAYED_MESSAGE: &str = "FailedRelayedMessage(bytes32)";
pub const ERC20_BRIDGE_INITIATED: &str =
    "ERC20BridgeInitiated(address,address,address,address,uint256,bytes)";
pub const ERC721_BRIDGE_INITIATED: &str =
    "ERC721BridgeInitiated(address,address,address,address,uint256,bytes)";

/// A decodable event kind
pub trait EventSchema: Sized {
    /// Event name used in error messages
    const NAME: &'static str;

    /// Returns true if `topic0` identifies this event kind.
    fn matches(topic0: &H256) -> bool;

    /// Decodes a log already known to carry this event's signature.
    fn decode(log: &EvmLog) -> Result<Self>;
}

/// Returns the first log in receipt order that carries `E`'s signature, decoded.
///
/// Later matching logs are ignored. A matching but malformed log is an error,
/// it is not skipped.
pub fn first_match<E: EventSchema>(logs: &[EvmLog]) -> Result<E> {
    let log = logs
        .iter()
        .find(|log| log.signature().map(E::matches).unwrap_or(false))
        .ok_or(TrackerError::EventNotFound { event: E::NAME })?;
    E::decode(log)
}

/// Like [`first_match`], restricted to logs emitted by `address`.
pub fn first_match_from<E: EventSchema>(logs: &[EvmLog], address: &H160) -> Result<E> {
    let log = logs
        .iter()
        .filter(|log| &log.address == address)
        .find(|log| log.signature().map(E::matches).unwrap_or(false))
        .ok_or(TrackerError::EventNotFound { event: E::NAME })?;
    E::decode(log)
}

/// Decodes every log carrying `E`'s signature, in order.
pub fn all_matches<'a, E: EventSchema + 'a>(
    logs: impl IntoIterator<Item = &'a EvmLog>,
) -> Result<Vec<E>> {
    logs.into_iter()
        .filter(|log| log.signature().map(E::matches).unwrap_or(false))
        .map(E::decode)
        .collect()
}

fn expect_topics(log: &EvmLog, event: &'static str, count: usize) -> Result<()> {
    if log.topics.len() != count {
        return Err(TrackerError::MalformedLog {
            event,
            reason: format!("expected {} topics, got {}", count, log.topics.len()),
        });
    }
    Ok(())
}

// ============================================================================
// MESSENGER EVENTS
// ============================================================================

/// `SentMessage(address indexed target, address sender, bytes message, uint256 messageNonce, uint256 gasLimit)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Messenger that emitted the event
    pub messenger: H160,
    pub target: H160,
    pub sender: H160,
    pub message: Vec<u8>,
    pub message_nonce: U256,
    pub gas_limit: U256,
}

impl EventSchema for SentMessage {
    const NAME: &'static str = "SentMessage";

    fn matches(topic0: &H256) -> bool {
        *topic0 == event_topic(SENT_MESSAGE)
    }

    fn decode(log: &EvmLog) -> Result<Self> {
        expect_topics(log, Self::NAME, 2)?;
        let data = log.data.as_slice();
        let malformed = |e| TrackerError::malformed(Self::NAME, e);

        Ok(Self {
            messenger: log.address,
            target: topic_to_address(&log.topics[1]).map_err(malformed)?,
            sender: read_address(data, 0).map_err(malformed)?,
            message: read_bytes(data, 1).map_err(malformed)?,
            message_nonce: read_uint(data, 2).map_err(malformed)?,
            gas_limit: read_uint(data, 3).map_err(malformed)?,
        })
    }
}

/// Which relay event was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// `RelayedMessage`: the target call succeeded
    Relayed,
    /// `FailedRelayedMessage`: the target call reverted and may be replayed
    Failed,
}

/// `RelayedMessage(bytes32 indexed msgHash)` or `FailedRelayedMessage(bytes32 indexed msgHash)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub status: RelayStatus,
    pub msg_hash: H256,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
}

impl RelayEvent {
    /// topic0 values for both outcomes, for OR filters.
    pub fn topics() -> Vec<H256> {
        vec![
            event_topic(RELAYED_MESSAGE),
            event_topic(FAILED_RELAYED_MESSAGE),
        ]
    }
}

impl EventSchema for RelayEvent {
    const NAME: &'static str = "RelayedMessage";

    fn matches(topic0: &H256) -> bool {
        *topic0 == event_topic(RELAYED_MESSAGE) || *topic0 == event_topic(FAILED_RELAYED_MESSAGE)
    }

    fn decode(log: &EvmLog) -> Result<Self> {
        expect_topics(log, Self::NAME, 2)?;
        let status = if log.topics[0] == event_topic(RELAYED_MESSAGE) {
            RelayStatus::Relayed
        } else {
            RelayStatus::Failed
        };
        Ok(Self {
            status,
            msg_hash: log.topics[1],
            block_number: log.block(),
            transaction_hash: log.transaction_hash,
        })
    }
}

// ============================================================================
// TOKEN BRIDGE EVENTS
// ============================================================================

/// Token standard handled by a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStandard {
    Erc20,
    Erc721,
}

impl TokenStandard {
    pub fn bridge_initiated_topic(&self) -> H256 {
        match self {
            TokenStandard::Erc20 => event_topic(ERC20_BRIDGE_INITIATED),
            TokenStandard::Erc721 => event_topic(ERC721_BRIDGE_INITIATED),
        }
    }
}

/// `ERC20BridgeInitiated` / `ERC721BridgeInitiated`
/// `(address indexed localToken, address indexed remoteToken, address indexed from, address to, uint256 amount, bytes extraData)`
///
/// For ERC721 `amount` is the token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInitiated {
    pub standard: TokenStandard,
    pub local_token: H160,
    pub remote_token: H160,
    pub from: H160,
    pub to: H160,
    pub amount: U256,
    pub extra_data: Vec<u8>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<u64>,
}

impl BridgeInitiated {
    pub fn decode(log: &EvmLog, standard: TokenStandard) -> Result<Self> {
        const NAME: &str = "BridgeInitiated";
        if log.signature() != Some(&standard.bridge_initiated_topic()) {
            return Err(TrackerError::MalformedLog {
                event: NAME,
                reason: format!("unexpected signature for {:?} bridge", standard),
            });
        }
        expect_topics(log, NAME, 4)?;
        let data = log.data.as_slice();
        let malformed = |e| TrackerError::malformed(NAME, e);

        Ok(Self {
            standard,
            local_token: topic_to_address(&log.topics[1]).map_err(malformed)?,
            remote_token: topic_to_address(&log.topics[2]).map_err(malformed)?,
            from: topic_to_address(&log.topics[3]).map_err(malformed)?,
            to: read_address(data, 0).map_err(malformed)?,
            amount: read_uint(data, 1).map_err(malformed)?,
            extra_data: read_bytes(data, 2).map_err(malformed)?,
            block_number: log.block(),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|i| i.as_u64()),
        })
    }
}
