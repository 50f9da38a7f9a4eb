//! Balance Diff Reporter
//!
//! Samples an account's balance on both chains and renders the latest value
//! with the change since the previous sample. When the source transaction's
//! receipt is supplied its fee is added back, so the rendered change is the
//! bridged amount alone.

use chain_clients_evm::{balance_of, EvmRpc, TransactionReceipt, H160, U256};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use crate::context::{BridgeContext, Chain};
use crate::error::{Result, TrackerError};

/// What balance to sample on a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    /// Native coin (`eth_getBalance`)
    Native,
    /// ERC20 `balanceOf` on the given token
    Erc20(H160),
    /// ERC721 `balanceOf` (token count) on the given collection
    Erc721(H160),
}

/// One balance reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSample {
    pub value: U256,
    pub at: DateTime<Utc>,
}

/// Signed amount stored as sign and magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedAmount {
    pub negative: bool,
    pub magnitude: U256,
}

impl SignedAmount {
    /// `to - from`
    pub fn difference(from: U256, to: U256) -> Self {
        if to >= from {
            Self {
                negative: false,
                magnitude: to - from,
            }
        } else {
            Self {
                negative: true,
                magnitude: from - to,
            }
        }
    }

    pub fn plus(self, amount: U256) -> Self {
        if !self.negative {
            return Self {
                negative: false,
                magnitude: self.magnitude.saturating_add(amount),
            };
        }
        Self::difference(self.magnitude, amount)
    }

    pub fn is_non_negative(&self) -> bool {
        !self.negative || self.magnitude.is_zero()
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_non_negative() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "-{}", self.magnitude)
        }
    }
}

/// Per-chain balance history for one account
#[derive(Debug, Clone)]
pub struct BalanceReporter {
    account: H160,
    assets: HashMap<Chain, Asset>,
    history: HashMap<Chain, Vec<BalanceSample>>,
}

impl BalanceReporter {
    /// Reports native balances on both chains.
    pub fn new(account: H160) -> Self {
        let assets = HashMap::from([(Chain::Hub, Asset::Native), (Chain::Verse, Asset::Native)]);
        Self {
            account,
            assets,
            history: HashMap::new(),
        }
    }

    pub fn with_asset(mut self, chain: Chain, asset: Asset) -> Self {
        self.assets.insert(chain, asset);
        self
    }

    pub fn account(&self) -> H160 {
        self.account
    }

    pub fn history(&self, chain: Chain) -> &[BalanceSample] {
        self.history.get(&chain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Samples both chains and appends the readings.
    pub async fn update(&mut self, ctx: &BridgeContext) -> Result<()> {
        let markers = &ctx.watcher.transient_error_markers;
        let (hub, verse) = futures::try_join!(
            self.read(ctx.hub.as_ref(), Chain::Hub, markers),
            self.read(ctx.verse.as_ref(), Chain::Verse, markers),
        )?;
        let now = Utc::now();
        self.record(Chain::Hub, hub, now);
        self.record(Chain::Verse, verse, now);
        Ok(())
    }

    async fn read(&self, client: &dyn EvmRpc, chain: Chain, markers: &[String]) -> Result<U256> {
        let asset = self.assets.get(&chain).copied().unwrap_or(Asset::Native);
        let value = match asset {
            Asset::Native => client.balance(self.account).await,
            Asset::Erc20(token) | Asset::Erc721(token) => {
                balance_of(client, token, self.account).await
            }
        };
        value.map_err(|e| TrackerError::from_rpc(e, markers))
    }

    /// Appends a reading taken elsewhere.
    pub fn record(&mut self, chain: Chain, value: U256, at: DateTime<Utc>) {
        self.history
            .entry(chain)
            .or_default()
            .push(BalanceSample { value, at });
    }

    /// Latest balance followed by its change, e.g. `1000 (+250)`.
    ///
    /// With fewer than two samples only the balance is rendered (0 when empty).
    pub fn current(&self, chain: Chain, receipt: Option<&TransactionReceipt>) -> String {
        let current = self
            .history(chain)
            .last()
            .map(|s| s.value)
            .unwrap_or_default();
        format!("{}{}", current, self.diff(chain, receipt))
    }

    /// Change between the last two samples, or an empty string.
    ///
    /// With a receipt the fee `gasUsed * effectiveGasPrice` is added back; a
    /// change that is still negative is shown together with that fee.
    pub fn diff(&self, chain: Chain, receipt: Option<&TransactionReceipt>) -> String {
        let samples = self.history(chain);
        let (a, b) = match samples {
            [.., a, b] => (a.value, b.value),
            _ => return String::new(),
        };

        let change = SignedAmount::difference(a, b);
        let receipt = match receipt {
            Some(receipt) => receipt,
            None => {
                return if change.is_non_negative() {
                    format!(" (+{})", change)
                } else {
                    format!(" ({})", change)
                };
            }
        };

        let gas = receipt.gas_cost();
        let change = change.plus(gas);
        if change.is_non_negative() {
            format!(" (+{})", change)
        } else {
            format!(" ({}, gas: -{})", change, gas)
        }
    }

    /// Time between the last two samples on `chain`.
    pub fn elapsed(&self, chain: Chain) -> Option<chrono::Duration> {
        match self.history(chain) {
            [.., a, b] => Some(b.at - a.at),
            _ => None,
        }
    }
}

/// Renders elapsed wall time as seconds, e.g. `12.5 sec`.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    format!("{} sec", elapsed.num_milliseconds() as f64 / 1000.0)
}
