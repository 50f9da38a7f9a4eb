//! Configuration Management Module
//!
//! This module handles loading and validating configuration for the bridge tracker.
//! Configuration covers the Hub-Layer and Verse-Layer endpoints, the bridge contract
//! addresses on each side, and the polling and retry settings of the relay watcher.

use anyhow::Context;
use chain_clients_evm::abi::parse_address;
use chain_clients_evm::H160;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the configuration file location
pub const CONFIG_PATH_ENV: &str = "BRIDGE_TRACKER_CONFIG_PATH";

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/bridge-tracker.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hub-Layer (L1) configuration
    pub hub_chain: HubChainConfig,
    /// Verse-Layer (L2) configuration
    pub verse_chain: VerseChainConfig,
    /// Relay watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Hub-Layer connection and contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// RPC endpoint URL
    pub rpc_url: String,
    pub chain_id: u64,
    /// L1CrossDomainMessenger deployed for the verse
    pub l1_cross_domain_messenger: String,
    /// L1StandardBridge deployed for the verse
    pub l1_standard_bridge: String,
    /// L1ERC721Bridge deployed for the verse (optional, not every verse has one)
    #[serde(default)]
    pub l1_erc721_bridge: Option<String>,
}

/// Verse-Layer connection and predeploy addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseChainConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    /// Verse contract generation (0 = legacy, 1 = current); version 1 forwards
    /// native withdrawals as message value
    #[serde(default = "default_verse_version")]
    pub version: u8,
    #[serde(default = "default_l2_cross_domain_messenger")]
    pub l2_cross_domain_messenger: String,
    #[serde(default = "default_l2_standard_bridge")]
    pub l2_standard_bridge: String,
    #[serde(default = "default_l2_erc721_bridge")]
    pub l2_erc721_bridge: String,
}

/// Relay watcher polling and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Interval between polls of an indefinite watch (milliseconds)
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Blocks behind the head covered by a bounded scan
    #[serde(default = "default_scan_look_back_blocks")]
    pub scan_look_back_blocks: u64,
    /// Attempts made by the scan-until-found loop
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Pause between attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Node error messages containing any of these are retried
    #[serde(default = "default_transient_error_markers")]
    pub transient_error_markers: Vec<String>,
}

fn default_verse_version() -> u8 {
    1
}

fn default_l2_cross_domain_messenger() -> String {
    "0x4200000000000000000000000000000000000007".to_string()
}

fn default_l2_standard_bridge() -> String {
    "0x4200000000000000000000000000000000000010".to_string()
}

fn default_l2_erc721_bridge() -> String {
    "0x6200000000000000000000000000000000000001".to_string()
}

fn default_polling_interval_ms() -> u64 {
    30_000
}

fn default_scan_look_back_blocks() -> u64 {
    1500
}

fn default_retry_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_transient_error_markers() -> Vec<String> {
    crate::error::default_transient_markers()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            scan_look_back_blocks: default_scan_look_back_blocks(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            transient_error_markers: default_transient_error_markers(),
        }
    }
}

impl WatcherConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for Config {
    /// Oasys testnet paired with the Sand Verse.
    fn default() -> Self {
        Self {
            hub_chain: HubChainConfig {
                name: "Oasys Testnet".to_string(),
                rpc_url: "https://rpc.testnet.oasys.games".to_string(),
                chain_id: 9372,
                l1_cross_domain_messenger: "0xa04B03350eE9E3fdd1C2f63fAD5e0CabBb476594".to_string(),
                l1_standard_bridge: "0x9245e19eB88de2534E03E764FB2a5f194e6d97AD".to_string(),
                l1_erc721_bridge: None,
            },
            verse_chain: VerseChainConfig {
                name: "Sand Verse".to_string(),
                rpc_url: "https://rpc.sandverse.oasys.games".to_string(),
                chain_id: 20197,
                version: default_verse_version(),
                l2_cross_domain_messenger: default_l2_cross_domain_messenger(),
                l2_standard_bridge: default_l2_standard_bridge(),
                l2_erc721_bridge: default_l2_erc721_bridge(),
            },
            watcher: WatcherConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// The file is looked up in this order:
    /// 1. `path`, when given (the `--config` flag)
    /// 2. the `BRIDGE_TRACKER_CONFIG_PATH` environment variable
    /// 3. `config/bridge-tracker.toml`
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/bridge-tracker.template.toml config/bridge-tracker.toml\n\
                Then edit config/bridge-tracker.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration in {}", config_path))?;
        Ok(config)
    }

    /// Equivalent to `load_from_path(None)`.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - RPC URLs parse as http(s) URLs
    /// - Every contract address is a 20-byte hex address
    /// - Hub and verse have different chain IDs
    /// - The verse version is 0 or 1
    /// - Intervals and attempt counts are non-zero
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_rpc_url("hub_chain.rpc_url", &self.hub_chain.rpc_url)?;
        validate_rpc_url("verse_chain.rpc_url", &self.verse_chain.rpc_url)?;

        if self.hub_chain.chain_id == self.verse_chain.chain_id {
            anyhow::bail!(
                "Configuration error: hub and verse share chain ID {}",
                self.hub_chain.chain_id
            );
        }

        if self.verse_chain.version > 1 {
            anyhow::bail!(
                "Configuration error: unsupported verse version {} (expected 0 or 1)",
                self.verse_chain.version
            );
        }

        self.hub_addresses()?;
        self.verse_addresses()?;

        let watcher = &self.watcher;
        if watcher.polling_interval_ms == 0 {
            anyhow::bail!("Configuration error: watcher.polling_interval_ms must be positive");
        }
        if watcher.retry_attempts == 0 {
            anyhow::bail!("Configuration error: watcher.retry_attempts must be positive");
        }
        if watcher.scan_look_back_blocks == 0 {
            anyhow::bail!("Configuration error: watcher.scan_look_back_blocks must be positive");
        }

        Ok(())
    }

    /// Parsed Hub-Layer contract addresses.
    pub fn hub_addresses(&self) -> anyhow::Result<HubAddresses> {
        Ok(HubAddresses {
            cross_domain_messenger: address(
                "hub_chain.l1_cross_domain_messenger",
                &self.hub_chain.l1_cross_domain_messenger,
            )?,
            standard_bridge: address(
                "hub_chain.l1_standard_bridge",
                &self.hub_chain.l1_standard_bridge,
            )?,
            erc721_bridge: self
                .hub_chain
                .l1_erc721_bridge
                .as_deref()
                .map(|a| address("hub_chain.l1_erc721_bridge", a))
                .transpose()?,
        })
    }

    /// Parsed Verse-Layer contract addresses.
    pub fn verse_addresses(&self) -> anyhow::Result<VerseAddresses> {
        Ok(VerseAddresses {
            cross_domain_messenger: address(
                "verse_chain.l2_cross_domain_messenger",
                &self.verse_chain.l2_cross_domain_messenger,
            )?,
            standard_bridge: address(
                "verse_chain.l2_standard_bridge",
                &self.verse_chain.l2_standard_bridge,
            )?,
            erc721_bridge: address(
                "verse_chain.l2_erc721_bridge",
                &self.verse_chain.l2_erc721_bridge,
            )?,
        })
    }
}

/// Hub-Layer contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubAddresses {
    pub cross_domain_messenger: H160,
    pub standard_bridge: H160,
    pub erc721_bridge: Option<H160>,
}

/// Verse-Layer predeploys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseAddresses {
    pub cross_domain_messenger: H160,
    pub standard_bridge: H160,
    pub erc721_bridge: H160,
}

fn validate_rpc_url(field: &str, value: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Configuration error: {} is not a valid URL: {}", field, value))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => anyhow::bail!(
            "Configuration error: {} must use http or https, got {}",
            field,
            scheme
        ),
    }
}

fn address(field: &str, value: &str) -> anyhow::Result<H160> {
    parse_address(value)
        .with_context(|| format!("Configuration error: {} is not a valid address", field))
}
