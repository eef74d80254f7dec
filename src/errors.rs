//! Error taxonomy for the AMM client
//!
//! Every public entry point returns `Result<T, AmmError>`. Variants carry the
//! diagnostic payload a caller needs to render an operation-specific message:
//! - Codec failures report the layout name and the offending length or field
//! - Quote failures report the observed drift or the exhausted reserve
//! - Collaborator failures report the stage and, when known, the failing
//!   instruction of the submitted transaction

use serde::Serialize;
use thiserror::Error;

/// Comprehensive error type for all AMM client operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// Buffer length differs from the declared span of a fixed layout
    #[error("Malformed layout ({layout}): expected {expected} bytes, got {actual}")]
    MalformedLayout {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A value does not fit the declared width or fixed-point range of its field
    #[error("Field overflow ({field}): {value} exceeds maximum {max}")]
    FieldOverflow {
        field: &'static str,
        value: u128,
        max: u128,
    },

    /// Derived address does not match the stored nonce or seed
    #[error("Address mismatch ({context}): expected {expected}, derived {derived}")]
    AddressMismatch {
        context: &'static str,
        expected: String,
        derived: String,
    },

    /// Swap would drain a reserve to zero or below
    #[error("Swap exceeds reserve on side {side}: requested {requested}, reserve {reserve}")]
    ExceedsReserve {
        side: char,
        requested: u128,
        reserve: u64,
    },

    /// Invariant drift across the swap is larger than the pool tolerance
    #[error("Tolerance exceeded: invariant drift {drift} > tolerance {tolerance}")]
    ToleranceExceeded { drift: u128, tolerance: u64 },

    /// Account byte length matches no known pool layout variant
    #[error("Unknown pool layout: {len} bytes")]
    UnknownLayout { len: usize },

    /// A collaborator lookup or submission failed
    #[error("Upstream unavailable ({stage}): {reason}")]
    UpstreamUnavailable {
        stage: &'static str,
        reason: String,
        failed_instruction: Option<FailedInstruction>,
    },

    /// An enum byte on the wire has no defined meaning
    #[error("Invalid value {value} for {field}")]
    InvalidEnumValue { field: &'static str, value: u8 },

    /// Instruction discriminant not recognised
    #[error("Unknown instruction discriminant: {0}")]
    UnknownInstruction(u8),

    /// Text is not a canonical 32-byte base58 address
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Seed rejected by the derivation rules
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Caller-supplied argument rejected before any encoding
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two pools of a composite swap do not share the intermediate asset
    #[error("Route mismatch: intermediate mint {intermediate} is not mint A of the second pool ({second_mint_a})")]
    RouteMismatch {
        intermediate: String,
        second_mint_a: String,
    },

    /// Quoted counter-amount crosses the caller's bound
    #[error("Slippage exceeded: quoted {quoted}, limit {limit}")]
    SlippageExceeded { quoted: u64, limit: u64 },

    /// A required user token account does not exist on the ledger
    #[error("Token account {account} for mint {mint} does not exist")]
    MissingTokenAccount { account: String, mint: String },

    /// Pool account not found at the given address
    #[error("Pool not found: {0}")]
    PoolNotFound(String),

    /// Derived pool address is already taken
    #[error("Pool already exists: {0}")]
    PoolAlreadyExists(String),

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Position and operation of the instruction a submission failure points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedInstruction {
    pub index: usize,
    pub operation: String,
}

impl std::fmt::Display for FailedInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} ({})", self.index, self.operation)
    }
}

pub type AmmResult<T> = Result<T, AmmError>;

impl AmmError {
    /// Check if resubmitting the same request may succeed
    ///
    /// Only collaborator failures qualify. Quote failures are deterministic
    /// for the reserves they were computed against; see [`Self::needs_requote`].
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable {
                failed_instruction: None,
                ..
            }
        )
    }

    /// Quote failures that a fresh read of the reserves may clear
    pub fn needs_requote(&self) -> bool {
        matches!(
            self,
            Self::ToleranceExceeded { .. } | Self::SlippageExceeded { .. }
        )
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedLayout { .. }
            | Self::FieldOverflow { .. }
            | Self::UnknownLayout { .. }
            | Self::InvalidEnumValue { .. }
            | Self::UnknownInstruction(_) => "layout",
            Self::AddressMismatch { .. } | Self::InvalidAddress { .. } | Self::InvalidSeed(_) => {
                "address"
            }
            Self::ExceedsReserve { .. }
            | Self::ToleranceExceeded { .. }
            | Self::SlippageExceeded { .. }
            | Self::RouteMismatch { .. } => "quote",
            Self::UpstreamUnavailable { .. } => "upstream",
            Self::MissingTokenAccount { .. }
            | Self::PoolNotFound(_)
            | Self::PoolAlreadyExists(_) => "account",
            Self::InvalidArgument(_) => "argument",
            Self::Configuration(_) => "config",
        }
    }

    /// Stable machine-readable code for the variant
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedLayout { .. } => "MalformedLayout",
            Self::FieldOverflow { .. } => "FieldOverflow",
            Self::AddressMismatch { .. } => "AddressMismatch",
            Self::ExceedsReserve { .. } => "ExceedsReserve",
            Self::ToleranceExceeded { .. } => "ToleranceExceeded",
            Self::UnknownLayout { .. } => "UnknownLayout",
            Self::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            Self::InvalidEnumValue { .. } => "InvalidEnumValue",
            Self::UnknownInstruction(_) => "UnknownInstruction",
            Self::InvalidAddress { .. } => "InvalidAddress",
            Self::InvalidSeed(_) => "InvalidSeed",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::RouteMismatch { .. } => "RouteMismatch",
            Self::SlippageExceeded { .. } => "SlippageExceeded",
            Self::MissingTokenAccount { .. } => "MissingTokenAccount",
            Self::PoolNotFound(_) => "PoolNotFound",
            Self::PoolAlreadyExists(_) => "PoolAlreadyExists",
            Self::Configuration(_) => "Configuration",
        }
    }

    /// Render the error as a structured report for calling UIs
    pub fn report(&self) -> ErrorReport {
        let detail = match self {
            Self::ToleranceExceeded { drift, tolerance } => serde_json::json!({
                "drift": drift.to_string(),
                "tolerance": tolerance,
            }),
            Self::ExceedsReserve {
                side,
                requested,
                reserve,
            } => serde_json::json!({
                "side": side.to_string(),
                "requested": requested.to_string(),
                "reserve": reserve,
            }),
            Self::MalformedLayout {
                layout,
                expected,
                actual,
            } => serde_json::json!({
                "layout": layout,
                "expected": expected,
                "actual": actual,
            }),
            Self::UnknownLayout { len } => serde_json::json!({ "len": len }),
            Self::UpstreamUnavailable {
                stage,
                failed_instruction,
                ..
            } => serde_json::json!({
                "stage": stage,
                "failed_instruction": failed_instruction,
            }),
            Self::SlippageExceeded { quoted, limit } => serde_json::json!({
                "quoted": quoted,
                "limit": limit,
            }),
            _ => serde_json::Value::Null,
        };

        ErrorReport {
            code: self.code(),
            category: self.category(),
            message: self.to_string(),
            detail,
        }
    }
}

// Convenience constructors for common error scenarios
impl AmmError {
    pub fn malformed(layout: &'static str, expected: usize, actual: usize) -> Self {
        Self::MalformedLayout {
            layout,
            expected,
            actual,
        }
    }

    pub fn upstream(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            stage,
            reason: reason.into(),
            failed_instruction: None,
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

/// Serialisable failure envelope handed to presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub category: &'static str,
    pub message: String,
    pub detail: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AmmError::malformed("SingleFeePool", 226, 225);
        assert_eq!(
            err.to_string(),
            "Malformed layout (SingleFeePool): expected 226 bytes, got 225"
        );

        let err = AmmError::ToleranceExceeded {
            drift: 200,
            tolerance: 199,
        };
        assert_eq!(
            err.to_string(),
            "Tolerance exceeded: invariant drift 200 > tolerance 199"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(AmmError::upstream("submit", "timeout").is_retryable());

        let drifted = AmmError::ToleranceExceeded {
            drift: 1,
            tolerance: 0,
        };
        assert!(!drifted.is_retryable());
        assert!(drifted.needs_requote());
        let slipped = AmmError::SlippageExceeded {
            quoted: 182,
            limit: 200,
        };
        assert!(!slipped.is_retryable());
        assert!(slipped.needs_requote());
        assert!(!AmmError::upstream("submit", "timeout").needs_requote());

        let rejected = AmmError::UpstreamUnavailable {
            stage: "submit",
            reason: "custom program error".to_string(),
            failed_instruction: Some(FailedInstruction {
                index: 0,
                operation: "Swap".to_string(),
            }),
        };
        assert!(!rejected.is_retryable());
        assert!(!AmmError::UnknownLayout { len: 3 }.is_retryable());
        assert!(!AmmError::config("missing").is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(AmmError::UnknownLayout { len: 0 }.category(), "layout");
        assert_eq!(AmmError::InvalidSeed("x".into()).category(), "address");
        assert_eq!(
            AmmError::ExceedsReserve {
                side: 'B',
                requested: 1,
                reserve: 1
            }
            .category(),
            "quote"
        );
        assert_eq!(AmmError::upstream("blockhash", "x").category(), "upstream");
    }

    #[test]
    fn test_report_carries_drift() {
        let report = AmmError::ToleranceExceeded {
            drift: 200,
            tolerance: 100,
        }
        .report();
        assert_eq!(report.code, "ToleranceExceeded");
        assert_eq!(report.detail["drift"], "200");
        assert_eq!(report.detail["tolerance"], 100);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"category\":\"quote\""));
    }
}
