//! ammctl - command line front end for the AMM client
//!
//! Offline commands decode pool data, quote swaps and derive addresses
//! without touching the network. `fetch`, `find` and `swap` go through the
//! configured RPC endpoint.

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use amm_client::address::{
    derive_seeded, find_pool_authority, parse_address, pool_authority, pool_seed, pool_seed_now,
};
use amm_client::client::{fetch_pool, find_pools, AmmClient};
use amm_client::config::Config;
use amm_client::decoder::{decode_pool, PoolView};
use amm_client::filters::PoolFilter;
use amm_client::metrics::AmmMetrics;
use amm_client::orchestrator::Orchestrator;
use amm_client::quote::{quote_swap, simulate_swap, Reserves};
use amm_client::rpc::RpcAdapter;
use amm_client::structured_logging::init_logging;
use amm_client::wallet::WalletManager;
use amm_client::{Direction, LayoutVersion, ProgramIds};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "ammctl", author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "amm.toml")]
    config: PathBuf,

    /// AMM program id, overrides the configuration file
    #[arg(long, env = "AMM_PROGRAM_ID")]
    program_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode raw pool account data
    Decode {
        #[command(flatten)]
        input: PoolInput,
        /// Pool address to include in the output
        #[arg(long)]
        address: Option<String>,
    },
    /// Quote a swap against raw pool data and given reserves
    Quote {
        #[command(flatten)]
        input: PoolInput,
        #[command(flatten)]
        swap: SwapArgs,
        /// Vault A balance, smallest units
        #[arg(long)]
        reserve_a: u64,
        /// Vault B balance, smallest units
        #[arg(long)]
        reserve_b: u64,
        /// Report an out-of-tolerance quote instead of failing
        #[arg(long)]
        simulate: bool,
    },
    /// Derive the vault authority of a pool
    Authority {
        #[arg(long)]
        pool: String,
        /// Stored nonce to verify; searched when omitted
        #[arg(long)]
        nonce: Option<u8>,
    },
    /// Derive a seeded pool address
    PoolAddress {
        #[arg(long)]
        owner: String,
        /// Full seed; generated from the prefix and current time when omitted
        #[arg(long)]
        seed: Option<String>,
        /// Seed prefix
        #[arg(long, default_value = "AMM")]
        prefix: String,
        /// Timestamp in milliseconds for a generated seed
        #[arg(long)]
        timestamp_ms: Option<i64>,
    },
    /// Print the account filters used for pool discovery
    Filters {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Fetch and decode a pool over RPC
    Fetch {
        #[arg(long)]
        pool: String,
    },
    /// Find pools over RPC
    Find {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Swap against a pool using the configured wallet
    Swap {
        #[arg(long)]
        pool: String,
        #[command(flatten)]
        swap: SwapArgs,
        /// Minimum B received (a2b) or maximum B paid (b2a)
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct PoolInput {
    /// Pool data as hex
    #[arg(long)]
    hex: Option<String>,
    /// Pool data as base64
    #[arg(long)]
    base64: Option<String>,
    /// File holding raw pool data
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SwapArgs {
    /// a2b or b2a
    #[arg(long)]
    direction: Direction,
    /// Token A amount, smallest units
    #[arg(long)]
    amount: u64,
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long, value_enum, default_value_t = LayoutArg::SingleFee)]
    layout: LayoutArg,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long, requires = "mint_b")]
    mint_a: Option<String>,
    #[arg(long, requires = "mint_a")]
    mint_b: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    SingleFee,
    TieredFee,
}

impl From<LayoutArg> for LayoutVersion {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::SingleFee => LayoutVersion::SingleFee,
            LayoutArg::TieredFee => LayoutVersion::TieredFee,
        }
    }
}

#[derive(Serialize)]
struct AuthorityOutput {
    pool: String,
    authority: String,
    nonce: u8,
}

#[derive(Serialize)]
struct PoolAddressOutput {
    owner: String,
    seed: String,
    pool: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let level = if cli.verbose {
        "amm_client=debug,ammctl=debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging(level, cli.json_logs || config.logging.json)?;

    if let Err(e) = run(cli, config).await {
        if let Some(err) = e.downcast_ref::<amm_client::AmmError>() {
            eprintln!("{}", serde_json::to_string_pretty(&err.report())?);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Decode { input, address } => {
            let mut view = PoolView::from_state(&decode_pool(&input.read()?)?);
            if let Some(address) = address {
                view = view.with_address(&parse_address(&address)?);
            }
            print_json(&view)
        }
        Command::Quote {
            input,
            swap,
            reserve_a,
            reserve_b,
            simulate,
        } => {
            let state = decode_pool(&input.read()?)?;
            let reserves = Reserves::new(reserve_a, reserve_b);
            let quote = if simulate {
                simulate_swap(&state, reserves, swap.direction, swap.amount)?
            } else {
                quote_swap(&state, reserves, swap.direction, swap.amount)?
            };
            print_json(&quote)
        }
        Command::Authority { pool, nonce } => {
            let ids = program_ids(&config)?;
            let pool = parse_address(&pool)?;
            let (authority, nonce) = match nonce {
                Some(nonce) => (pool_authority(&pool, nonce, &ids.amm)?, nonce),
                None => find_pool_authority(&pool, &ids.amm)?,
            };
            print_json(&AuthorityOutput {
                pool: pool.to_string(),
                authority: authority.to_string(),
                nonce,
            })
        }
        Command::PoolAddress {
            owner,
            seed,
            prefix,
            timestamp_ms,
        } => {
            let ids = program_ids(&config)?;
            let owner = parse_address(&owner)?;
            let seed = match (seed, timestamp_ms) {
                (Some(seed), _) => seed,
                (None, Some(ts)) => pool_seed(&prefix, ts)?,
                (None, None) => pool_seed_now(&prefix)?,
            };
            let pool = derive_seeded(&owner, &seed, &ids.amm)?;
            print_json(&PoolAddressOutput {
                owner: owner.to_string(),
                seed,
                pool: pool.to_string(),
            })
        }
        Command::Filters { filter } => print_json(&filter.build()?.account_filters()),
        Command::Fetch { pool } => {
            let rpc = RpcAdapter::from_config(&config.network)?;
            let pool = parse_address(&pool)?;
            let state = fetch_pool(&rpc, &pool).await?;
            if state.status() != amm_client::PoolStatus::Active {
                warn!(pool = %pool, status = %state.status(), "Pool is not active");
            }
            print_json(&PoolView::from_state(&state).with_address(&pool))
        }
        Command::Find { filter } => {
            let ids = program_ids(&config)?;
            let rpc = RpcAdapter::from_config(&config.network)?;
            let pools = find_pools(&rpc, &ids.amm, &filter.build()?).await?;
            info!(count = pools.len(), "Pools found");
            print_json(&pools)
        }
        Command::Swap { pool, swap, limit } => {
            let ids = program_ids(&config)?;
            let pool = parse_address(&pool)?;
            let wallet = WalletManager::from_file(&config.wallet.keypair_path)
                .context("Failed to load wallet")?;
            info!(wallet = %wallet.pubkey(), cluster = %config.network.cluster, "Wallet loaded");

            let rpc = Arc::new(RpcAdapter::from_config(&config.network)?);
            let metrics = AmmMetrics::new()?;
            let orchestrator = Orchestrator::new(rpc.clone(), Arc::new(wallet));
            let client = AmmClient::new(ids, rpc, orchestrator)
                .with_metrics(metrics.clone())
                .with_seed_prefix(config.pool.seed_prefix.clone())
                .with_default_tolerance(config.pool.default_tolerance);

            let outcome = client.swap(&pool, swap.direction, swap.amount, limit).await?;
            tracing::debug!(metrics = %metrics.render(), "Metrics after swap");
            print_json(&outcome)
        }
    }
}

impl PoolInput {
    fn read(&self) -> Result<Vec<u8>> {
        if let Some(text) = &self.hex {
            return hex::decode(text.trim().trim_start_matches("0x")).context("Invalid hex input");
        }
        if let Some(text) = &self.base64 {
            return base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .context("Invalid base64 input");
        }
        if let Some(path) = &self.file {
            return std::fs::read(path)
                .with_context(|| format!("Failed to read pool data from {}", path.display()));
        }
        bail!("one of --hex, --base64 or --file is required")
    }
}

impl FilterArgs {
    fn build(&self) -> Result<PoolFilter> {
        let version = LayoutVersion::from(self.layout);
        let mut filter = PoolFilter::all(version);
        if let Some(owner) = &self.owner {
            filter.owner = Some(parse_address(owner)?);
        }
        if let (Some(mint_a), Some(mint_b)) = (&self.mint_a, &self.mint_b) {
            filter.mint_a = Some(parse_address(mint_a)?);
            filter.mint_b = Some(parse_address(mint_b)?);
        }
        Ok(filter)
    }
}

/// Load configuration, falling back to defaults when the file is absent
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        Config::from_file_with_env(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        Config::for_program(&Pubkey::default())
    };
    if let Some(program_id) = &cli.program_id {
        config.program.amm_program_id = program_id.clone();
    }
    Ok(config)
}

fn program_ids(config: &Config) -> Result<ProgramIds> {
    let ids = config.program_ids()?;
    if ids.amm == Pubkey::default() {
        bail!("no AMM program id: pass --program-id or set program.amm_program_id");
    }
    Ok(ids)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
