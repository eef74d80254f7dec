//! Keypair wallet for the CLI signer

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::path::Path;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::errors::{AmmError, AmmResult};
use crate::orchestrator::SignerService;

/// Local keypair signer
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Load a keypair file: a JSON array of 64 bytes or the raw 64 bytes
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let raw = Zeroizing::new(
            std::fs::read(&path)
                .with_context(|| format!("Failed to read keypair file: {}", path.display()))?,
        );

        let bytes: Zeroizing<Vec<u8>> = if raw.len() == 64 {
            Zeroizing::new(raw.to_vec())
        } else {
            Zeroizing::new(
                serde_json::from_slice::<Vec<u8>>(&raw).context("Failed to parse keypair JSON")?,
            )
        };

        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }

        let keypair = Keypair::try_from(bytes.as_slice()).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

#[async_trait]
impl SignerService for WalletManager {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, tx: &mut Transaction) -> AmmResult<()> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| AmmError::upstream("sign", e.to_string()))
    }
}

fn expand_home(path: &Path) -> std::path::PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}
