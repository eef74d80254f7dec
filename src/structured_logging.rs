//! Structured logging for client workflows
//!
//! Named events with a fixed field set, so log pipelines can key on them.
//! Also installs the `tracing-subscriber` stack used by the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AmmError;
use crate::observability::{CorrelationId, TraceContext};
use crate::quote::Quote;
use crate::tx_builder::Operation;

/// Structured logger bound to one workflow run
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    correlation_id: CorrelationId,
    workflow: String,
}

impl StructuredLogger {
    pub fn new(trace: &TraceContext) -> Self {
        Self {
            correlation_id: trace.correlation_id,
            workflow: trace.label(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_quote(&self, pool: &str, quote: &Quote) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            workflow = %self.workflow,
            pool = %pool,
            direction = %quote.direction,
            amount = quote.amount,
            output_amount = quote.output_amount,
            fee_amount = quote.fee_amount,
            drift = %quote.drift,
            "Quote computed"
        );
    }

    pub fn log_quote_rejected(&self, pool: &str, error: &AmmError) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            workflow = %self.workflow,
            pool = %pool,
            code = error.code(),
            error = %error,
            "Quote rejected"
        );
    }

    pub fn log_submit_attempt(&self, operations: &[Operation], signers: usize) {
        let ops: Vec<&str> = operations.iter().map(|op| op.as_str()).collect();
        tracing::info!(
            correlation_id = %self.correlation_id,
            workflow = %self.workflow,
            operations = ?ops,
            extra_signers = signers,
            "Submitting transaction"
        );
    }

    pub fn log_submit_success(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            workflow = %self.workflow,
            signature = %signature,
            latency_ms = latency_ms,
            "Transaction submitted"
        );
    }

    pub fn log_submit_failure(&self, stage: &str, error: &AmmError, latency_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            workflow = %self.workflow,
            stage = %stage,
            code = error.code(),
            error = %error,
            latency_ms = latency_ms,
            "Transaction failed"
        );
    }
}

/// Install the global subscriber
///
/// `directive` follows `RUST_LOG` syntax; `RUST_LOG` itself wins when set.
pub fn init_logging(directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }
    Ok(())
}
