//! Transaction orchestration
//!
//! Turns a [`TransactionPlan`] into one signed transaction and hands it to
//! the ledger gateway exactly once. Signing, blockhash lookup and network
//! submission are delegated to collaborators behind the traits below; retry
//! and backoff are theirs to implement, never this module's.
//!
//! Instruction order is preserved. When any stage before submission fails
//! nothing is submitted.

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::sync::Arc;

use crate::errors::{AmmError, AmmResult, FailedInstruction};
use crate::filters::AccountFilter;
use crate::metrics::{AmmMetrics, Timer};
use crate::observability::{CorrelationId, TraceContext};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{sanity_check_ix_order, TransactionPlan};

/// Failure reported by the ledger for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    pub reason: String,
    /// Position of the instruction the ledger rejected, when it says
    pub instruction_index: Option<usize>,
}

impl SubmitFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            instruction_index: None,
        }
    }

    pub fn at_instruction(mut self, index: usize) -> Self {
        self.instruction_index = Some(index);
        self
    }
}

/// Recent ledger state and transaction submission
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn latest_blockhash(&self) -> AmmResult<Hash>;

    /// Submit a fully signed transaction and wait for the ledger's verdict
    async fn submit(&self, tx: &Transaction) -> Result<Signature, SubmitFailure>;
}

/// Wallet that pays fees and signs as the user
#[async_trait]
pub trait SignerService: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Add this signer's signature to `tx`
    async fn sign_transaction(&self, tx: &mut Transaction) -> AmmResult<()>;
}

/// Read access to ledger accounts
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Raw account data, `None` when the account does not exist
    async fn account_data(&self, address: &Pubkey) -> AmmResult<Option<Vec<u8>>>;

    /// Token amount held by an SPL token account, smallest units
    async fn token_balance(&self, token_account: &Pubkey) -> AmmResult<u64>;

    async fn mint_decimals(&self, mint: &Pubkey) -> AmmResult<u8>;

    async fn rent_exempt_minimum(&self, data_len: usize) -> AmmResult<u64>;

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> AmmResult<Vec<(Pubkey, Vec<u8>)>>;
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    #[serde(serialize_with = "serialize_signature")]
    pub signature: Signature,
    pub instruction_count: usize,
    pub correlation_id: CorrelationId,
}

/// Signs and submits transaction plans
#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn LedgerGateway>,
    signer: Arc<dyn SignerService>,
    metrics: Option<AmmMetrics>,
}

impl Orchestrator {
    pub fn new(ledger: Arc<dyn LedgerGateway>, signer: Arc<dyn SignerService>) -> Self {
        Self {
            ledger,
            signer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: AmmMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fee payer and user signer
    pub fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub async fn execute(&self, plan: TransactionPlan) -> AmmResult<SubmissionOutcome> {
        self.execute_traced(plan, &TraceContext::new("execute")).await
    }

    pub async fn execute_traced(
        &self,
        plan: TransactionPlan,
        trace: &TraceContext,
    ) -> AmmResult<SubmissionOutcome> {
        let span = trace.stage("orchestrate");
        let logger = StructuredLogger::new(&span);
        let timer = Timer::new();

        logger.log_submit_attempt(&plan.operations(), plan.extra_signers.len());

        match self.run(&plan, &logger).await {
            Ok(signature) => {
                logger.log_submit_success(&signature.to_string(), timer.elapsed_ms());
                if let Some(metrics) = &self.metrics {
                    metrics.submissions_success.inc();
                    timer.observe_duration(&metrics.submit_latency);
                }
                Ok(SubmissionOutcome {
                    success: true,
                    signature,
                    instruction_count: plan.len(),
                    correlation_id: span.correlation_id,
                })
            }
            Err(err) => {
                let stage = match &err {
                    AmmError::UpstreamUnavailable { stage, .. } => *stage,
                    _ => "prepare",
                };
                logger.log_submit_failure(stage, &err, timer.elapsed_ms());
                if let Some(metrics) = &self.metrics {
                    metrics.submissions_failed.inc();
                    timer.observe_duration(&metrics.submit_latency);
                }
                Err(err)
            }
        }
    }

    async fn run(&self, plan: &TransactionPlan, logger: &StructuredLogger) -> AmmResult<Signature> {
        if plan.is_empty() {
            return Err(AmmError::invalid_argument("transaction plan has no instructions"));
        }
        sanity_check_ix_order(plan)?;

        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| as_upstream("blockhash", e))?;

        let payer = self.signer.pubkey();
        let mut tx = Transaction::new_with_payer(&plan.instructions(), Some(&payer));
        tx.message.recent_blockhash = blockhash;

        self.signer
            .sign_transaction(&mut tx)
            .await
            .map_err(|e| as_upstream("sign", e))?;

        if !plan.extra_signers.is_empty() {
            let extra: Vec<&Keypair> = plan.extra_signers.iter().collect();
            tx.try_partial_sign(&extra, blockhash)
                .map_err(|e| AmmError::upstream("sign", e.to_string()))?;
        }
        if !tx.is_signed() {
            return Err(AmmError::upstream(
                "sign",
                "transaction is missing required signatures",
            ));
        }

        if let Some(metrics) = &self.metrics {
            metrics.instructions_built.inc_by(plan.len() as u64);
        }
        tracing::debug!(
            correlation_id = %logger.correlation_id(),
            payer = %payer,
            blockhash = %blockhash,
            "Transaction signed"
        );

        self.ledger.submit(&tx).await.map_err(|failure| {
            let failed_instruction = failure.instruction_index.map(|index| FailedInstruction {
                index,
                operation: plan
                    .instructions
                    .get(index)
                    .map(|ix| ix.operation.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
            AmmError::UpstreamUnavailable {
                stage: "submit",
                reason: failure.reason,
                failed_instruction,
            }
        })
    }
}

fn as_upstream(stage: &'static str, err: AmmError) -> AmmError {
    match err {
        AmmError::UpstreamUnavailable { .. } => err,
        other => AmmError::upstream(stage, other.to_string()),
    }
}

fn serialize_signature<S: serde::Serializer>(sig: &Signature, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(sig)
}
