//! JSON-RPC collaborator adapter
//!
//! Implements [`LedgerGateway`] and [`AccountSource`] on top of the
//! nonblocking `solana-client`. Every call is a single request; retry policy
//! is left to the RPC endpoint and to callers.

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::errors::{AmmError, AmmResult};
use crate::filters::AccountFilter;
use crate::orchestrator::{AccountSource, LedgerGateway, SubmitFailure};

/// RPC-backed ledger access
#[derive(Clone)]
pub struct RpcAdapter {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcAdapter {
    pub fn new(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url.to_string(), commitment)),
            commitment,
        }
    }

    pub fn from_config(network: &NetworkConfig) -> AmmResult<Self> {
        Ok(Self::new(&network.rpc_url, parse_commitment(&network.commitment)?))
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

pub fn parse_commitment(text: &str) -> AmmResult<CommitmentConfig> {
    match text {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(AmmError::config(format!("unknown commitment '{other}'"))),
    }
}

/// Convert a discovery filter into its RPC form
pub fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::DataSize(len) => RpcFilterType::DataSize(*len),
        AccountFilter::Memcmp { offset, bytes } => {
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
        }
    }
}

#[async_trait]
impl LedgerGateway for RpcAdapter {
    async fn latest_blockhash(&self) -> AmmResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| AmmError::upstream("blockhash", e.to_string()))
    }

    async fn submit(&self, tx: &Transaction) -> Result<Signature, SubmitFailure> {
        match self.client.send_and_confirm_transaction(tx).await {
            Ok(signature) => {
                debug!(signature = %signature, "Transaction confirmed");
                Ok(signature)
            }
            Err(e) => {
                let failure = SubmitFailure::new(e.to_string());
                let failure = match e.get_transaction_error() {
                    Some(TransactionError::InstructionError(index, _)) => {
                        failure.at_instruction(index as usize)
                    }
                    _ => failure,
                };
                warn!(error = %failure.reason, index = ?failure.instruction_index, "Submission rejected");
                Err(failure)
            }
        }
    }
}

#[async_trait]
impl AccountSource for RpcAdapter {
    async fn account_data(&self, address: &Pubkey) -> AmmResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| AmmError::upstream("account_data", e.to_string()))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> AmmResult<u64> {
        let balance = self
            .client
            .get_token_account_balance(token_account)
            .await
            .map_err(|e| AmmError::upstream("token_balance", e.to_string()))?;
        balance.amount.parse::<u64>().map_err(|e| {
            AmmError::upstream(
                "token_balance",
                format!("unparseable amount '{}': {e}", balance.amount),
            )
        })
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> AmmResult<u8> {
        let data = self
            .account_data(mint)
            .await?
            .ok_or_else(|| AmmError::upstream("mint_decimals", format!("mint {mint} not found")))?;
        let mint_state = spl_token::state::Mint::unpack(&data)
            .map_err(|e| AmmError::upstream("mint_decimals", format!("mint {mint}: {e}")))?;
        Ok(mint_state.decimals)
    }

    async fn rent_exempt_minimum(&self, data_len: usize) -> AmmResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| AmmError::upstream("rent", e.to_string()))
    }

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> AmmResult<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(to_rpc_filter).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(|e| AmmError::upstream("program_accounts", e.to_string()))?;
        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_parsing() {
        assert_eq!(parse_commitment("finalized").unwrap(), CommitmentConfig::finalized());
        assert!(parse_commitment("max").is_err());
    }

    #[test]
    fn test_filter_conversion() {
        let key = Pubkey::new_unique();
        match to_rpc_filter(&AccountFilter::Memcmp {
            offset: 34,
            bytes: key.to_bytes().to_vec(),
        }) {
            RpcFilterType::Memcmp(memcmp) => {
                assert_eq!(memcmp.offset(), 34);
                assert!(memcmp.bytes_match(&{
                    let mut data = vec![0u8; 34];
                    data.extend_from_slice(key.as_ref());
                    data
                }));
            }
            other => panic!("unexpected filter {other:?}"),
        }
        assert!(matches!(
            to_rpc_filter(&AccountFilter::DataSize(226)),
            RpcFilterType::DataSize(226)
        ));
    }
}
