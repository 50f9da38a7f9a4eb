//! Per-process chain pair.

use anyhow::Context;
use chain_clients_evm::{EvmClient, EvmRpc, U256};
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, HubAddresses, VerseAddresses, WatcherConfig};

/// Side of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    /// Hub-Layer (L1)
    Hub,
    /// Verse-Layer (L2)
    Verse,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Hub => write!(f, "Hub"),
            Chain::Verse => write!(f, "Verse"),
        }
    }
}

/// RPC clients and contract addresses for one Hub/Verse pair.
///
/// Built once from [`Config`] and passed by reference to every operation.
#[derive(Clone)]
pub struct BridgeContext {
    pub hub: Arc<dyn EvmRpc>,
    pub verse: Arc<dyn EvmRpc>,
    pub hub_addresses: HubAddresses,
    pub verse_addresses: VerseAddresses,
    /// Verse contract generation, see [`crate::config::VerseChainConfig::version`]
    pub verse_version: u8,
    pub watcher: WatcherConfig,
}

impl BridgeContext {
    /// Connects HTTP clients to both chains.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let hub = EvmClient::new(&config.hub_chain.rpc_url)
            .with_context(|| format!("Failed to create client for {}", config.hub_chain.name))?;
        let verse = EvmClient::new(&config.verse_chain.rpc_url)
            .with_context(|| format!("Failed to create client for {}", config.verse_chain.name))?;
        Self::with_clients(config, Arc::new(hub), Arc::new(verse))
    }

    /// Uses the given clients instead of HTTP ones.
    pub fn with_clients(
        config: &Config,
        hub: Arc<dyn EvmRpc>,
        verse: Arc<dyn EvmRpc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            hub,
            verse,
            hub_addresses: config.hub_addresses()?,
            verse_addresses: config.verse_addresses()?,
            verse_version: config.verse_chain.version,
            watcher: config.watcher.clone(),
        })
    }

    /// Value field of the message sent by a withdrawal of `amount`.
    ///
    /// Version 1 verses forward a native withdrawal as message value. Token
    /// withdrawals and legacy verses send none.
    pub fn withdrawal_message_value(&self, amount: U256, native: bool) -> U256 {
        if native && self.verse_version >= 1 {
            amount
        } else {
            U256::zero()
        }
    }

    pub fn client(&self, chain: Chain) -> &Arc<dyn EvmRpc> {
        match chain {
            Chain::Hub => &self.hub,
            Chain::Verse => &self.verse,
        }
    }
}
