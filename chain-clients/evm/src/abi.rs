//! ABI Encoding Module
//!
//! Minimal Solidity ABI codec used to reproduce relay calldata byte-for-byte and
//! to decode event logs. Only the argument kinds that appear in the bridge
//! messenger interfaces are supported: `address`, `uint256`, `bytes32` and the
//! dynamic `bytes`.

use ethereum_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Size of one ABI word in bytes
pub const WORD_SIZE: usize = 32;

/// Errors raised while decoding ABI data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// A word or byte range extends past the end of the data blob
    #[error("ABI data too short: need {needed} bytes, have {available}")]
    OutOfBounds { needed: usize, available: usize },
    /// A dynamic offset or length does not fit in memory
    #[error("ABI offset or length overflow: {0}")]
    Overflow(U256),
    /// An address word carries non-zero bytes above the low 20 bytes
    #[error("ABI word is not a left-padded address: 0x{0}")]
    DirtyAddress(String),
    /// Input could not be parsed as hex
    #[error("invalid hex input: {0}")]
    InvalidHex(String),
}

/// A single ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `address`, left-padded to one word
    Address(H160),
    /// `uint256`
    Uint(U256),
    /// `bytes32`
    FixedBytes32(H256),
    /// `bytes`, encoded in the tail section
    Bytes(Vec<u8>),
}

// ============================================================================
// HASHING
// ============================================================================

/// Computes the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Returns the 4-byte function selector for a canonical signature such as
/// `relayMessage(address,address,bytes,uint256)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Returns topic0 for a canonical event signature.
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encodes an address as a left-padded word.
pub fn encode_address(address: &H160) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Encodes a 256-bit unsigned integer as a big-endian word.
pub fn encode_uint(value: &U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Encodes a u64 as a big-endian word.
pub fn encode_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encodes the tail of a dynamic `bytes` value: length word followed by the
/// data, right-padded with zeros to a word boundary.
pub fn encode_bytes_tail(data: &[u8]) -> Vec<u8> {
    let padding = (WORD_SIZE - (data.len() % WORD_SIZE)) % WORD_SIZE;
    let mut out = Vec::with_capacity(WORD_SIZE + data.len() + padding);
    out.extend_from_slice(&encode_u64(data.len() as u64));
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}

/// ABI-encodes an argument list (head followed by tail).
pub fn encode_arguments(tokens: &[Token]) -> Vec<u8> {
    let head_size = tokens.len() * WORD_SIZE;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => head.extend_from_slice(&encode_address(address)),
            Token::Uint(value) => head.extend_from_slice(&encode_uint(value)),
            Token::FixedBytes32(value) => head.extend_from_slice(value.as_bytes()),
            Token::Bytes(data) => {
                head.extend_from_slice(&encode_u64((head_size + tail.len()) as u64));
                tail.extend(encode_bytes_tail(data));
            }
        }
    }

    head.extend(tail);
    head
}

/// ABI-encodes a full function call: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut calldata = function_selector(signature).to_vec();
    calldata.extend(encode_arguments(tokens));
    calldata
}

// ============================================================================
// DECODING
// ============================================================================

/// Reads the word at `index` (counted in words from the start of `data`).
pub fn read_word(data: &[u8], index: usize) -> Result<[u8; 32], AbiError> {
    let start = index
        .checked_mul(WORD_SIZE)
        .ok_or(AbiError::Overflow(U256::from(index)))?;
    read_word_at(data, start)
}

fn read_word_at(data: &[u8], start: usize) -> Result<[u8; 32], AbiError> {
    let end = start
        .checked_add(WORD_SIZE)
        .ok_or(AbiError::Overflow(U256::from(start)))?;
    if data.len() < end {
        return Err(AbiError::OutOfBounds {
            needed: end,
            available: data.len(),
        });
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[start..end]);
    Ok(word)
}

/// Reads a `uint256` word.
pub fn read_uint(data: &[u8], index: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(&read_word(data, index)?))
}

/// Reads an `address` word, rejecting words with dirty upper bytes.
pub fn read_address(data: &[u8], index: usize) -> Result<H160, AbiError> {
    word_to_address(&read_word(data, index)?)
}

/// Reads a dynamic `bytes` argument whose offset word sits at `index`.
pub fn read_bytes(data: &[u8], index: usize) -> Result<Vec<u8>, AbiError> {
    let offset = u256_to_usize(read_uint(data, index)?)?;
    let length = u256_to_usize(U256::from_big_endian(&read_word_at(data, offset)?))?;

    let start = offset + WORD_SIZE;
    let end = start
        .checked_add(length)
        .ok_or(AbiError::Overflow(U256::from(length)))?;
    if data.len() < end {
        return Err(AbiError::OutOfBounds {
            needed: end,
            available: data.len(),
        });
    }
    Ok(data[start..end].to_vec())
}

/// Interprets an indexed topic as an address.
pub fn topic_to_address(topic: &H256) -> Result<H160, AbiError> {
    word_to_address(topic.as_fixed_bytes())
}

fn word_to_address(word: &[u8; 32]) -> Result<H160, AbiError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::DirtyAddress(hex::encode(word)));
    }
    Ok(H160::from_slice(&word[12..]))
}

fn u256_to_usize(value: U256) -> Result<usize, AbiError> {
    if value.bits() > 64 {
        return Err(AbiError::Overflow(value));
    }
    usize::try_from(value.low_u64()).map_err(|_| AbiError::Overflow(value))
}

// ============================================================================
// HEX HELPERS
// ============================================================================

/// Decodes a hex string with or without the `0x` prefix.
pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, AbiError> {
    let clean = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(clean).map_err(|e| AbiError::InvalidHex(format!("{}: {}", input, e)))
}

/// Parses a 20-byte address from hex.
pub fn parse_address(input: &str) -> Result<H160, AbiError> {
    let bytes = hex_to_bytes(input)?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidHex(format!(
            "{}: expected 20 bytes, got {}",
            input,
            bytes.len()
        )));
    }
    Ok(H160::from_slice(&bytes))
}

/// Parses a 32-byte hash from hex.
pub fn parse_h256(input: &str) -> Result<H256, AbiError> {
    let bytes = hex_to_bytes(input)?;
    if bytes.len() != 32 {
        return Err(AbiError::InvalidHex(format!(
            "{}: expected 32 bytes, got {}",
            input,
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}

/// Formats bytes as `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
