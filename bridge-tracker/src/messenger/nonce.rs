//! Versioned message nonces.
//!
//! The top 16 bits of a messenger nonce carry the message format version, the
//! low 240 bits the sequence number.

use chain_clients_evm::U256;

use crate::error::{Result, TrackerError};

/// Bit offset of the version tag
pub const VERSION_SHIFT: usize = 240;

/// Message format versions the codec implements
pub const SUPPORTED_VERSIONS: [u64; 2] = [0, 1];

fn sequence_mask() -> U256 {
    (U256::one() << VERSION_SHIFT) - U256::one()
}

/// A nonce split into its version tag and sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedNonce {
    pub version: U256,
    pub sequence: U256,
}

impl VersionedNonce {
    /// Splits a raw nonce. Never fails; version checks happen where the version is consumed.
    pub fn decode(nonce: U256) -> Self {
        Self {
            version: nonce >> VERSION_SHIFT,
            sequence: nonce & sequence_mask(),
        }
    }

    /// Packs `(version << 240) | sequence`, the layout the messenger contracts use.
    pub fn encode(sequence: U256, version: u64) -> Result<U256> {
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(TrackerError::UnsupportedVersion(U256::from(version)));
        }
        if sequence > sequence_mask() {
            return Err(TrackerError::SequenceOutOfRange(sequence));
        }
        Ok((U256::from(version) << VERSION_SHIFT) | sequence)
    }

    /// Version as a small integer, or `None` when it is not 0 or 1.
    pub fn supported_version(&self) -> Option<u64> {
        SUPPORTED_VERSIONS
            .iter()
            .copied()
            .find(|v| self.version == U256::from(*v))
    }
}

/// The bridge SDK's `encodeVersionedNonce` formula, `version | (sequence >> 240)`.
///
/// Not an inverse of [`VersionedNonce::decode`]: the low 240 bits of `sequence`
/// are discarded and the version lands in the low bits. Only useful for
/// reproducing values produced by that helper.
pub fn legacy_encode_versioned_nonce(sequence: U256, version: u64) -> Result<U256> {
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(TrackerError::UnsupportedVersion(U256::from(version)));
    }
    Ok(U256::from(version) | (sequence >> VERSION_SHIFT))
}
