//! Bridge Tracker CLI
//!
//! Derives cross-domain message hashes and waits for their relays between a
//! Hub-Layer and a Verse-Layer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin bridge-tracker -- --config config/bridge-tracker.toml \
//!     watch-deposit --tx 0x... --value 10000000
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! BRIDGE_TRACKER_CONFIG_PATH=config/bridge-tracker.toml cargo run --bin bridge-tracker -- check-config
//! ```

use anyhow::{Context, Result};
use bridge_tracker::bridge_messages::{
    deposits_by_address, withdrawals_by_address, BlockRange, TokenBridgeMessage,
};
use bridge_tracker::reporter::format_elapsed;
use bridge_tracker::{
    derive_message_hashes, Asset, BalanceReporter, BridgeContext, BridgeTracker, Chain, Config,
    Direction, RelayOutcome, RelayRequest, RetryPolicy, TokenStandard, WaitStrategy,
};
use chain_clients_evm::abi::{parse_address, parse_h256};
use chain_clients_evm::{H160, H256, U256};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bridge-tracker")]
#[command(about = "Track cross-domain messages between a Hub-Layer and a Verse-Layer")]
struct Args {
    /// Path to configuration file (default: config/bridge-tracker.toml or BRIDGE_TRACKER_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the message hashes of a bridge transaction
    Hash {
        /// Chain the transaction was sent on
        #[arg(long, value_enum)]
        chain: ChainArg,
        #[arg(long, value_parser = parse_tx_hash)]
        tx: H256,
        /// Native value sent with the message (wei)
        #[arg(long, value_parser = parse_amount, default_value = "0")]
        value: U256,
    },
    /// Wait for Hub-to-Verse messages to be relayed
    WatchDeposit(WatchArgs),
    /// Wait for Verse-to-Hub messages to be relayed
    WatchWithdrawal(WatchArgs),
    /// Scan recent blocks for the relay of a message hash
    Scan {
        /// Chain the relay is expected on
        #[arg(long, value_enum)]
        chain: ChainArg,
        #[arg(long, value_parser = parse_tx_hash)]
        msg_hash: H256,
        /// Blocks behind the head to scan (default from config)
        #[arg(long)]
        look_back: Option<u64>,
        /// Keep scanning under the configured retry policy
        #[arg(long)]
        until_found: bool,
    },
    /// Print an account's balances on both chains
    Balances {
        #[arg(long, value_parser = parse_account)]
        account: H160,
        #[command(flatten)]
        assets: AssetArgs,
    },
    /// List token deposits initiated by an address on the Hub-Layer
    Deposits(EnumerateArgs),
    /// List token withdrawals initiated by an address on the Verse-Layer
    Withdrawals(EnumerateArgs),
    /// Load and validate the configuration
    CheckConfig,
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    /// Source chain transactions; several are watched concurrently
    #[arg(long = "tx", required = true, num_args = 1.., value_parser = parse_tx_hash)]
    txs: Vec<H256>,
    /// Native value sent with each deposit, or the amount of each withdrawal (wei)
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    value: U256,
    /// Repeat bounded scans instead of polling from the head
    #[arg(long)]
    scan: bool,
    /// First destination block to poll
    #[arg(long)]
    from_block: Option<u64>,
    /// Polling interval in milliseconds (default from config)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Give up after this many polls
    #[arg(long)]
    max_polls: Option<u32>,
    /// Account whose balances are reported before and after the relay
    #[arg(long, value_parser = parse_account)]
    account: Option<H160>,
    #[command(flatten)]
    assets: AssetArgs,
}

#[derive(clap::Args, Debug)]
struct AssetArgs {
    #[arg(long, value_enum, default_value = "native")]
    asset: AssetKind,
    /// Token contract on the Hub-Layer
    #[arg(long, value_parser = parse_account)]
    hub_token: Option<H160>,
    /// Token contract on the Verse-Layer
    #[arg(long, value_parser = parse_account)]
    verse_token: Option<H160>,
}

#[derive(clap::Args, Debug)]
struct EnumerateArgs {
    #[arg(long, value_parser = parse_account)]
    address: H160,
    #[arg(long, value_enum, default_value = "erc20")]
    standard: StandardArg,
    #[arg(long)]
    from_block: Option<u64>,
    #[arg(long)]
    to_block: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChainArg {
    Hub,
    Verse,
}

impl From<ChainArg> for Chain {
    fn from(chain: ChainArg) -> Self {
        match chain {
            ChainArg::Hub => Chain::Hub,
            ChainArg::Verse => Chain::Verse,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AssetKind {
    Native,
    Erc20,
    Erc721,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StandardArg {
    Erc20,
    Erc721,
}

impl From<StandardArg> for TokenStandard {
    fn from(standard: StandardArg) -> Self {
        match standard {
            StandardArg::Erc20 => TokenStandard::Erc20,
            StandardArg::Erc721 => TokenStandard::Erc721,
        }
    }
}

fn parse_tx_hash(value: &str) -> std::result::Result<H256, String> {
    parse_h256(value).map_err(|e| e.to_string())
}

fn parse_account(value: &str) -> std::result::Result<H160, String> {
    parse_address(value).map_err(|e| e.to_string())
}

fn parse_amount(value: &str) -> std::result::Result<U256, String> {
    U256::from_dec_str(value).map_err(|e| format!("invalid amount {}: {:?}", value, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_from_path(args.config.as_deref())?;
    info!(
        "Hub: {} (chain ID: {}), Verse: {} (chain ID: {})",
        config.hub_chain.name,
        config.hub_chain.chain_id,
        config.verse_chain.name,
        config.verse_chain.chain_id
    );

    if let Command::CheckConfig = args.command {
        println!("Configuration OK");
        return Ok(());
    }

    let ctx = BridgeContext::from_config(&config)?;

    match args.command {
        Command::Hash { chain, tx, value } => hash(&ctx, chain.into(), tx, value).await,
        Command::WatchDeposit(watch_args) => watch(ctx, Direction::Deposit, watch_args).await,
        Command::WatchWithdrawal(watch_args) => watch(ctx, Direction::Withdrawal, watch_args).await,
        Command::Scan {
            chain,
            msg_hash,
            look_back,
            until_found,
        } => scan(ctx, chain.into(), msg_hash, look_back, until_found).await,
        Command::Balances { account, assets } => {
            let mut reporter = balance_reporter(account, &assets)?;
            reporter.update(&ctx).await?;
            println!("balance on Hub-Layer  : {}", reporter.current(Chain::Hub, None));
            println!("balance on Verse-Layer: {}", reporter.current(Chain::Verse, None));
            Ok(())
        }
        Command::Deposits(enumerate) => {
            let messages = deposits_by_address(
                &ctx,
                enumerate.standard.into(),
                enumerate.address,
                BlockRange {
                    from_block: enumerate.from_block,
                    to_block: enumerate.to_block,
                },
            )
            .await?;
            print_messages(&messages);
            Ok(())
        }
        Command::Withdrawals(enumerate) => {
            let messages = withdrawals_by_address(
                &ctx,
                enumerate.standard.into(),
                enumerate.address,
                BlockRange {
                    from_block: enumerate.from_block,
                    to_block: enumerate.to_block,
                },
            )
            .await?;
            print_messages(&messages);
            Ok(())
        }
        Command::CheckConfig => Ok(()),
    }
}

async fn hash(ctx: &BridgeContext, chain: Chain, tx: H256, value: U256) -> Result<()> {
    let messenger = match chain {
        Chain::Hub => ctx.hub_addresses.cross_domain_messenger,
        Chain::Verse => ctx.verse_addresses.cross_domain_messenger,
    };
    let receipt = ctx
        .client(chain)
        .transaction_receipt(tx)
        .await
        .with_context(|| format!("Failed to fetch receipt {:#x}", tx))?
        .with_context(|| format!("Transaction {:#x} not found on {}", tx, chain))?;

    let hashes = derive_message_hashes(&receipt, &messenger, value)?;
    if hashes.is_empty() {
        anyhow::bail!("No SentMessage events from {:#x} in {:#x}", messenger, tx);
    }
    for msg_hash in hashes {
        println!("{:#x}", msg_hash);
    }
    Ok(())
}

async fn watch(ctx: BridgeContext, direction: Direction, args: WatchArgs) -> Result<()> {
    let mut reporter = match args.account {
        Some(account) => {
            let mut reporter = balance_reporter(account, &args.assets)?;
            reporter.update(&ctx).await?;
            Some(reporter)
        }
        None => None,
    };

    let tracker = BridgeTracker::new(ctx);
    let strategy = if args.scan {
        WaitStrategy::Scan
    } else {
        let mut options = tracker.default_watch_options();
        options.from_block = args.from_block;
        options.max_polls = args.max_polls;
        if let Some(interval_ms) = args.interval_ms {
            options.polling_interval = Duration::from_millis(interval_ms);
        }
        WaitStrategy::Poll(options)
    };

    let value = match direction {
        Direction::Deposit => args.value,
        Direction::Withdrawal => tracker
            .context()
            .withdrawal_message_value(args.value, matches!(args.assets.asset, AssetKind::Native)),
    };
    let requests: Vec<RelayRequest> = args
        .txs
        .iter()
        .map(|tx_hash| RelayRequest {
            direction,
            tx_hash: *tx_hash,
            value,
        })
        .collect();

    let label = match direction {
        Direction::Deposit => "[Hub-Layer > Verse-Layer]",
        Direction::Withdrawal => "[Verse-Layer > Hub-Layer]",
    };
    info!("{} Wait for the Relayer to relay {} message(s)...", label, requests.len());

    let start = Utc::now();
    let results = tracker.confirm_many(&requests, strategy).await;
    let elapsed = Utc::now() - start;

    let mut failures = 0;
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(outcome) => print_outcome(request, &outcome),
            Err(e) => {
                failures += 1;
                println!("tx {:#x}: {}", request.tx_hash, e);
            }
        }
    }
    println!("    elapsed: {}", format_elapsed(elapsed));

    if let Some(reporter) = reporter.as_mut() {
        reporter.update(tracker.context()).await?;
        println!("    balance on Hub-Layer  : {}", reporter.current(Chain::Hub, None));
        println!("    balance on Verse-Layer: {}", reporter.current(Chain::Verse, None));
    }

    if failures > 0 {
        anyhow::bail!("{} of {} relays could not be confirmed", failures, requests.len());
    }
    Ok(())
}

async fn scan(
    ctx: BridgeContext,
    chain: Chain,
    msg_hash: H256,
    look_back: Option<u64>,
    until_found: bool,
) -> Result<()> {
    let tracker = BridgeTracker::new(ctx);
    let watcher = match chain {
        Chain::Verse => tracker.deposit_watcher(),
        Chain::Hub => tracker.withdrawal_watcher(),
    };
    let settings = &tracker.context().watcher;
    let look_back = look_back.unwrap_or(settings.scan_look_back_blocks);

    let outcome = if until_found {
        watcher
            .scan_until_found(msg_hash, look_back, RetryPolicy::from(settings))
            .await?
    } else {
        watcher.scan(msg_hash, look_back).await?
    };

    println!(
        "{} in tx {:#x} (gas: {})",
        if outcome.is_relayed() { "relayed" } else { "relay failed" },
        outcome.transaction_hash(),
        outcome.receipt().gas_used
    );
    Ok(())
}

fn balance_reporter(account: H160, assets: &AssetArgs) -> Result<BalanceReporter> {
    let reporter = BalanceReporter::new(account);
    let token = |chain: &str, address: Option<H160>| {
        address.with_context(|| format!("--{}-token is required for token balances", chain))
    };
    Ok(match assets.asset {
        AssetKind::Native => reporter,
        AssetKind::Erc20 => reporter
            .with_asset(Chain::Hub, Asset::Erc20(token("hub", assets.hub_token)?))
            .with_asset(Chain::Verse, Asset::Erc20(token("verse", assets.verse_token)?)),
        AssetKind::Erc721 => reporter
            .with_asset(Chain::Hub, Asset::Erc721(token("hub", assets.hub_token)?))
            .with_asset(Chain::Verse, Asset::Erc721(token("verse", assets.verse_token)?)),
    })
}

fn print_outcome(request: &RelayRequest, outcome: &RelayOutcome) {
    println!("tx {:#x}: done", request.tx_hash);
    println!(
        "    relayer tx: {:#x} (gas: {})",
        outcome.transaction_hash(),
        outcome.receipt().gas_used
    );
    println!("    message hash: {:#x}", outcome.msg_hash());
    if !outcome.is_relayed() {
        println!("    relay FAILED on the destination chain");
    }
}

fn print_messages(messages: &[TokenBridgeMessage]) {
    if messages.is_empty() {
        println!("No bridge messages found");
        return;
    }
    for message in messages {
        println!(
            "block {} tx {:#x} log {}: {:#x} -> {:#x} l1Token {:#x} l2Token {:#x} amount {}",
            message.block_number,
            message.transaction_hash,
            message.log_index,
            message.from,
            message.to,
            message.l1_token,
            message.l2_token,
            message.amount
        );
    }
}
