//! JSON-RPC wire types for EVM nodes.
//!
//! Field names follow the camelCase JSON-RPC encoding. Hashes and addresses are
//! parsed into fixed-size types so that malformed node responses fail at the
//! deserialization boundary.

use ethereum_types::{H160, H256, U256, U64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::abi::{hex_to_bytes, to_hex};

/// Byte string carried as `0x`-prefixed hex on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex_to_bytes(&raw)
            .map(HexBytes)
            .map_err(serde::de::Error::custom)
    }
}

/// EVM event log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: H160,
    /// Array of topics (topic0 is the event signature for non-anonymous events)
    pub topics: Vec<H256>,
    /// Non-indexed event parameters
    pub data: HexBytes,
    /// Block number (null for pending logs)
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<U64>,
    /// Transaction hash (null for pending logs)
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<H256>,
    /// Log index within the block
    #[serde(rename = "logIndex", default)]
    pub log_index: Option<U64>,
}

impl EvmLog {
    /// Returns topic0, the event signature hash.
    pub fn signature(&self) -> Option<&H256> {
        self.topics.first()
    }

    /// Block number as u64, if the log is mined.
    pub fn block(&self) -> Option<u64> {
        self.block_number.map(|n| n.as_u64())
    }
}

/// Transaction receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: H256,
    #[serde(rename = "blockNumber")]
    pub block_number: U64,
    #[serde(default)]
    pub from: Option<H160>,
    #[serde(default)]
    pub to: Option<H160>,
    #[serde(rename = "gasUsed")]
    pub gas_used: U256,
    /// Absent on some pre-London nodes
    #[serde(rename = "effectiveGasPrice", default)]
    pub effective_gas_price: Option<U256>,
    /// 1 = success, 0 = failure
    #[serde(default)]
    pub status: Option<U64>,
    /// Logs in emission order
    #[serde(default)]
    pub logs: Vec<EvmLog>,
}

impl TransactionReceipt {
    /// Fee paid by the sender: `gasUsed * effectiveGasPrice`.
    pub fn gas_cost(&self) -> U256 {
        self.effective_gas_price
            .map(|price| self.gas_used.saturating_mul(price))
            .unwrap_or_default()
    }

    /// Whether the transaction executed successfully.
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s.as_u64() == 1).unwrap_or(true)
    }
}

/// Block selector for log queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Number(u64),
    Latest,
}

impl BlockTag {
    pub fn to_param(&self) -> String {
        match self {
            BlockTag::Number(n) => format!("0x{:x}", n),
            BlockTag::Latest => "latest".to_string(),
        }
    }
}

/// Filter for `eth_getLogs`.
///
/// Each topic position is either a wildcard (`None`) or a set of accepted
/// values (OR semantics within the position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: H160,
    pub topics: Vec<Option<Vec<H256>>>,
    pub from_block: BlockTag,
    pub to_block: BlockTag,
}

impl LogFilter {
    pub fn new(address: H160) -> Self {
        Self {
            address,
            topics: Vec::new(),
            from_block: BlockTag::Latest,
            to_block: BlockTag::Latest,
        }
    }

    /// Sets the accepted values for the next topic position.
    pub fn topic(mut self, values: Vec<H256>) -> Self {
        self.topics.push(Some(values));
        self
    }

    /// Leaves the next topic position unconstrained.
    pub fn any_topic(mut self) -> Self {
        self.topics.push(None);
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = BlockTag::Number(block);
        self
    }

    pub fn to_block(mut self, block: BlockTag) -> Self {
        self.to_block = block;
        self
    }

    /// Builds the JSON filter object sent as the single `eth_getLogs` parameter.
    pub fn to_json(&self) -> serde_json::Value {
        let topics: Vec<serde_json::Value> = self
            .topics
            .iter()
            .map(|position| match position {
                None => serde_json::Value::Null,
                Some(values) if values.len() == 1 => {
                    serde_json::json!(format!("{:#x}", values[0]))
                }
                Some(values) => serde_json::Value::Array(
                    values
                        .iter()
                        .map(|v| serde_json::json!(format!("{:#x}", v)))
                        .collect(),
                ),
            })
            .collect();

        serde_json::json!({
            "address": format!("{:#x}", self.address),
            "topics": topics,
            "fromBlock": self.from_block.to_param(),
            "toBlock": self.to_block.to_param(),
        })
    }
}

/// Returns true when `log` was emitted by `address`.
pub fn emitted_by(log: &EvmLog, address: &H160) -> bool {
    &log.address == address
}

/// Returns true when an address is the zero address.
pub fn is_zero_address(address: &H160) -> bool {
    address.is_zero()
}
