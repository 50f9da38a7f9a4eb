//! Relay call encoding.
//!
//! The destination messenger identifies a message by the Keccak hash of the
//! `relayMessage` calldata it would be invoked with, so these encoders must
//! match the contract ABI byte for byte.

use chain_clients_evm::abi::{encode_call, Token};
use chain_clients_evm::{H160, U256};

use super::nonce::VersionedNonce;
use crate::error::{Result, TrackerError};

/// Pre-upgrade relay call: `(target, sender, message, nonce)`
pub const RELAY_MESSAGE_V0: &str = "relayMessage(address,address,bytes,uint256)";

/// Current relay call: `(nonce, sender, target, value, gasLimit, message)`
pub const RELAY_MESSAGE_V1: &str = "relayMessage(uint256,address,address,uint256,uint256,bytes)";

/// A cross-domain message as dispatched by the source messenger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossDomainMessage {
    pub nonce: U256,
    pub sender: H160,
    pub target: H160,
    /// Native value forwarded with the relay (version 1 only)
    pub value: Option<U256>,
    /// Gas budget on the destination chain (version 1 only)
    pub gas_limit: Option<U256>,
    pub data: Vec<u8>,
}

impl CrossDomainMessage {
    pub fn version(&self) -> U256 {
        VersionedNonce::decode(self.nonce).version
    }

    /// Relay calldata for this message, picked by the nonce version.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_cross_domain_message(
            self.nonce,
            self.sender,
            self.target,
            self.value,
            self.gas_limit,
            &self.data,
        )
    }
}

/// Encodes a version 0 relay call.
pub fn encode_v0(target: H160, sender: H160, data: &[u8], nonce: U256) -> Vec<u8> {
    encode_call(
        RELAY_MESSAGE_V0,
        &[
            Token::Address(target),
            Token::Address(sender),
            Token::Bytes(data.to_vec()),
            Token::Uint(nonce),
        ],
    )
}

/// Encodes a version 1 relay call.
pub fn encode_v1(
    nonce: U256,
    sender: H160,
    target: H160,
    value: U256,
    gas_limit: U256,
    data: &[u8],
) -> Vec<u8> {
    encode_call(
        RELAY_MESSAGE_V1,
        &[
            Token::Uint(nonce),
            Token::Address(sender),
            Token::Address(target),
            Token::Uint(value),
            Token::Uint(gas_limit),
            Token::Bytes(data.to_vec()),
        ],
    )
}

/// Encodes a relay call in the format selected by the version in `nonce`.
///
/// Version 0 ignores `value` and `gas_limit`. Version 1 requires both.
pub fn encode_cross_domain_message(
    nonce: U256,
    sender: H160,
    target: H160,
    value: Option<U256>,
    gas_limit: Option<U256>,
    data: &[u8],
) -> Result<Vec<u8>> {
    let decoded = VersionedNonce::decode(nonce);
    match decoded.supported_version() {
        Some(0) => Ok(encode_v0(target, sender, data, nonce)),
        Some(1) => match (value, gas_limit) {
            (Some(value), Some(gas_limit)) => {
                Ok(encode_v1(nonce, sender, target, value, gas_limit, data))
            }
            _ => Err(TrackerError::MissingValueOrGasLimit),
        },
        _ => Err(TrackerError::UnknownVersion(decoded.version)),
    }
}
