//! Token bridge message enumeration.
//!
//! Lists ERC20 and ERC721 bridge transfers initiated by an address, newest first.

use chain_clients_evm::abi::encode_address;
use chain_clients_evm::{BlockTag, EvmRpc, LogFilter, H160, H256, U256};

use crate::context::BridgeContext;
use crate::error::{Result, TrackerError};
use crate::events::{BridgeInitiated, TokenStandard};

/// Direction a message travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Hub-Layer to Verse-Layer (deposit)
    L1ToL2,
    /// Verse-Layer to Hub-Layer (withdrawal)
    L2ToL1,
}

/// A bridge transfer as seen on its source chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBridgeMessage {
    pub direction: MessageDirection,
    pub from: H160,
    pub to: H160,
    pub l1_token: H160,
    pub l2_token: H160,
    /// Token amount, or the token id for ERC721
    pub amount: U256,
    pub data: Vec<u8>,
    pub log_index: u64,
    pub block_number: u64,
    pub transaction_hash: H256,
}

/// Optional block range for enumeration queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRange {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

/// Deposits initiated by `address` on the Hub-Layer bridge for `standard`.
pub async fn deposits_by_address(
    ctx: &BridgeContext,
    standard: TokenStandard,
    address: H160,
    range: BlockRange,
) -> Result<Vec<TokenBridgeMessage>> {
    let bridge = match standard {
        TokenStandard::Erc20 => ctx.hub_addresses.standard_bridge,
        TokenStandard::Erc721 => ctx
            .hub_addresses
            .erc721_bridge
            .ok_or(TrackerError::NotConfigured("hub_chain.l1_erc721_bridge"))?,
    };
    let events = bridge_initiated(
        ctx.hub.as_ref(),
        bridge,
        standard,
        address,
        range,
        &ctx.watcher.transient_error_markers,
    )
    .await?;
    Ok(to_messages(events, MessageDirection::L1ToL2))
}

/// Withdrawals initiated by `address` on the Verse-Layer bridge for `standard`.
pub async fn withdrawals_by_address(
    ctx: &BridgeContext,
    standard: TokenStandard,
    address: H160,
    range: BlockRange,
) -> Result<Vec<TokenBridgeMessage>> {
    let bridge = match standard {
        TokenStandard::Erc20 => ctx.verse_addresses.standard_bridge,
        TokenStandard::Erc721 => ctx.verse_addresses.erc721_bridge,
    };
    let events = bridge_initiated(
        ctx.verse.as_ref(),
        bridge,
        standard,
        address,
        range,
        &ctx.watcher.transient_error_markers,
    )
    .await?;
    Ok(to_messages(events, MessageDirection::L2ToL1))
}

async fn bridge_initiated(
    client: &dyn EvmRpc,
    bridge: H160,
    standard: TokenStandard,
    from: H160,
    range: BlockRange,
    transient_markers: &[String],
) -> Result<Vec<BridgeInitiated>> {
    let mut filter = LogFilter::new(bridge)
        .topic(vec![standard.bridge_initiated_topic()])
        .any_topic()
        .any_topic()
        .topic(vec![H256::from(encode_address(&from))])
        .from_block(range.from_block.unwrap_or(0));
    if let Some(to_block) = range.to_block {
        filter = filter.to_block(BlockTag::Number(to_block));
    }

    let logs = client
        .get_logs(&filter)
        .await
        .map_err(|e| TrackerError::from_rpc(e, transient_markers))?;

    logs.iter()
        .map(|log| BridgeInitiated::decode(log, standard))
        .collect()
}

/// Drops entries without both token addresses, maps to messages and sorts by
/// descending block number.
pub fn to_messages(
    events: Vec<BridgeInitiated>,
    direction: MessageDirection,
) -> Vec<TokenBridgeMessage> {
    let mut messages: Vec<TokenBridgeMessage> = events
        .into_iter()
        .filter(|e| !e.local_token.is_zero() && !e.remote_token.is_zero())
        .map(|e| {
            // The local token lives on the source chain
            let (l1_token, l2_token) = match direction {
                MessageDirection::L1ToL2 => (e.local_token, e.remote_token),
                MessageDirection::L2ToL1 => (e.remote_token, e.local_token),
            };
            TokenBridgeMessage {
                direction,
                from: e.from,
                to: e.to,
                l1_token,
                l2_token,
                amount: e.amount,
                data: e.extra_data,
                log_index: e.log_index.unwrap_or_default(),
                block_number: e.block_number.unwrap_or_default(),
                transaction_hash: e.transaction_hash.unwrap_or_default(),
            }
        })
        .collect();

    messages.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    messages
}
