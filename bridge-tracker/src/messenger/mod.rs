//! Cross-domain messenger protocol: nonce versioning, relay call encoding and
//! message identifiers.

pub mod codec;
pub mod hash;
pub mod nonce;

pub use codec::{encode_cross_domain_message, encode_v0, encode_v1, CrossDomainMessage};
pub use hash::{derive_message_hash, derive_message_hash_from, derive_message_hashes, message_hash};
pub use nonce::{legacy_encode_versioned_nonce, VersionedNonce};
