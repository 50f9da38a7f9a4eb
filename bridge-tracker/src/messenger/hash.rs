//! Message identifier derivation.

use chain_clients_evm::abi::keccak256;
use chain_clients_evm::{TransactionReceipt, H160, H256, U256};

use super::codec::CrossDomainMessage;
use crate::error::Result;
use crate::events::{all_matches, first_match, first_match_from, SentMessage};

/// Keccak hash of the relay calldata; the key the destination messenger emits.
pub fn message_hash(message: &CrossDomainMessage) -> Result<H256> {
    Ok(H256::from(keccak256(&message.encode()?)))
}

impl SentMessage {
    /// Rebuilds the relayed message. `value` is not part of the event and
    /// must be supplied by the caller.
    pub fn to_message(&self, value: U256) -> CrossDomainMessage {
        CrossDomainMessage {
            nonce: self.message_nonce,
            sender: self.sender,
            target: self.target,
            value: Some(value),
            gas_limit: Some(self.gas_limit),
            data: self.message.clone(),
        }
    }
}

/// Derives the identifier of the first message sent in `receipt`.
///
/// # Arguments
///
/// * `receipt` - Source chain receipt containing a `SentMessage` log
/// * `value` - Native value sent with the message
///
/// # Returns
///
/// * `Ok(H256)` - The relay message hash
/// * `Err(TrackerError::EventNotFound)` - No `SentMessage` log in the receipt
pub fn derive_message_hash(receipt: &TransactionReceipt, value: U256) -> Result<H256> {
    let sent: SentMessage = first_match(&receipt.logs)?;
    let hash = message_hash(&sent.to_message(value))?;
    tracing::debug!(
        tx_hash = %format!("{:#x}", receipt.transaction_hash),
        msg_hash = %format!("{:#x}", hash),
        nonce = %sent.message_nonce,
        "Derived message hash"
    );
    Ok(hash)
}

/// Like [`derive_message_hash`], considering only logs emitted by `messenger`.
pub fn derive_message_hash_from(
    receipt: &TransactionReceipt,
    messenger: &H160,
    value: U256,
) -> Result<H256> {
    let sent: SentMessage = first_match_from(&receipt.logs, messenger)?;
    message_hash(&sent.to_message(value))
}

/// Derives identifiers for every message `messenger` sent in `receipt`, in log order.
pub fn derive_message_hashes(
    receipt: &TransactionReceipt,
    messenger: &H160,
    value: U256,
) -> Result<Vec<H256>> {
    let sent: Vec<SentMessage> =
        all_matches(receipt.logs.iter().filter(|log| &log.address == messenger))?;
    sent.iter()
        .map(|event| message_hash(&event.to_message(value)))
        .collect()
}
