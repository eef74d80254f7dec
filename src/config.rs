//! Configuration for the AMM client
//!
//! Settings are loaded from a TOML file and may be overridden from the
//! environment (`AMM_RPC_URL`, `AMM_PROGRAM_ID`, a `.env` file is honoured).
//! Program identifiers are resolved once into an immutable [`ProgramIds`]
//! which is handed to builders and clients at construction, so several
//! networks can be addressed from one process.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::address::{parse_address, DEFAULT_SEED_PREFIX};
use crate::errors::{AmmError, AmmResult};

pub const ENV_RPC_URL: &str = "AMM_RPC_URL";
pub const ENV_PROGRAM_ID: &str = "AMM_PROGRAM_ID";

/// Program identifiers used when building instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub amm: Pubkey,
    pub token: Pubkey,
}

impl ProgramIds {
    /// AMM program with the canonical SPL token program
    pub fn new(amm: Pubkey) -> Self {
        Self {
            amm,
            token: spl_token::id(),
        }
    }

    pub fn with_token_program(mut self, token: Pubkey) -> Self {
        self.token = token;
        self
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    pub program: ProgramConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Cluster label used in logs (devnet, testnet, mainnet-beta, localnet)
    #[serde(default = "default_cluster")]
    pub cluster: String,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// AMM program address in base58
    pub amm_program_id: String,

    #[serde(default = "default_token_program_id")]
    pub token_program_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Prefix of the seeded pool account name
    #[serde(default = "default_seed_prefix")]
    pub seed_prefix: String,

    /// Invariant tolerance for newly created pools
    #[serde(default = "default_tolerance")]
    pub default_tolerance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to a JSON keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_cluster() -> String { "devnet".to_string() }
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_token_program_id() -> String { spl_token::id().to_string() }
fn default_seed_prefix() -> String { DEFAULT_SEED_PREFIX.to_string() }
fn default_tolerance() -> u64 { 1_000 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_log_level() -> String { "amm_client=info".to_string() }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            seed_prefix: default_seed_prefix(),
            default_tolerance: default_tolerance(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Configuration for a given AMM program with every other field defaulted
    pub fn for_program(amm_program_id: &Pubkey) -> Self {
        Self {
            network: NetworkConfig::default(),
            program: ProgramConfig {
                amm_program_id: amm_program_id.to_string(),
                token_program_id: default_token_program_id(),
            },
            pool: PoolConfig::default(),
            wallet: WalletConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|v| !v.is_empty()) {
            self.network.rpc_url = url;
        }
        if let Some(id) = lookup(ENV_PROGRAM_ID).filter(|v| !v.is_empty()) {
            self.program.amm_program_id = id;
        }
    }

    pub fn validate(&self) -> AmmResult<()> {
        self.program_ids()?;

        if !self.network.rpc_url.starts_with("http://") && !self.network.rpc_url.starts_with("https://") {
            return Err(AmmError::config(format!(
                "network.rpc_url '{}' must be an http(s) URL",
                self.network.rpc_url
            )));
        }
        if !matches!(
            self.network.commitment.as_str(),
            "processed" | "confirmed" | "finalized"
        ) {
            return Err(AmmError::config(format!(
                "network.commitment '{}' must be processed, confirmed or finalized",
                self.network.commitment
            )));
        }
        if self.pool.seed_prefix.is_empty() || self.pool.seed_prefix.len() > 16 {
            return Err(AmmError::config(
                "pool.seed_prefix must be 1 to 16 bytes so the timestamped seed fits 32 bytes",
            ));
        }
        if tracing_subscriber::EnvFilter::from_str(&self.logging.level).is_err() {
            return Err(AmmError::config(format!(
                "logging.level '{}' is not a valid filter directive",
                self.logging.level
            )));
        }
        Ok(())
    }

    pub fn program_ids(&self) -> AmmResult<ProgramIds> {
        let amm = parse_address(&self.program.amm_program_id)
            .map_err(|e| AmmError::config(format!("program.amm_program_id: {e}")))?;
        let token = parse_address(&self.program.token_program_id)
            .map_err(|e| AmmError::config(format!("program.token_program_id: {e}")))?;
        Ok(ProgramIds::new(amm).with_token_program(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_file_gets_defaults() {
        let program = Pubkey::new_unique();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[program]\namm_program_id = \"{program}\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.commitment, "confirmed");
        assert_eq!(config.pool.seed_prefix, "AMM");
        assert_eq!(config.program_ids().unwrap(), ProgramIds::new(program));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::for_program(&Pubkey::new_unique());
        let other = Pubkey::new_unique();
        config.apply_env_overrides(|key| match key {
            ENV_RPC_URL => Some("http://127.0.0.1:8899".to_string()),
            ENV_PROGRAM_ID => Some(other.to_string()),
            _ => None,
        });

        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.program_ids().unwrap().amm, other);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::for_program(&Pubkey::new_unique());
        assert!(config.validate().is_ok());

        config.program.amm_program_id = "bogus".to_string();
        assert!(matches!(config.validate(), Err(AmmError::Configuration(_))));

        let mut config = Config::for_program(&Pubkey::new_unique());
        config.network.commitment = "max".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::for_program(&Pubkey::new_unique());
        config.pool.seed_prefix = "x".repeat(17);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_program_ids_coexist() {
        let devnet = ProgramIds::new(Pubkey::new_unique());
        let localnet = ProgramIds::new(Pubkey::new_unique());
        assert_ne!(devnet, localnet);
        assert_eq!(devnet.token, localnet.token);
    }
}
