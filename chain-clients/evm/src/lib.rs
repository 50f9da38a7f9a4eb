//! EVM chain client
//!
//! JSON-RPC access to EVM nodes plus the ABI and Keccak primitives needed to
//! reproduce cross-domain relay calldata.

pub mod abi;
pub mod client;
pub mod types;

pub use abi::AbiError;
pub use client::{balance_of, EvmClient, EvmError, EvmRpc};
pub use types::{BlockTag, EvmLog, HexBytes, LogFilter, TransactionReceipt};

// Re-export the primitive types so downstream crates use the same versions
pub use ethereum_types::{H160, H256, U256, U64};
