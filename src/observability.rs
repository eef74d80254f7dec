//! Correlation ids and workflow trace context

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Id shared by every log line and outcome of one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a log line sits inside a client workflow
///
/// A workflow such as `swap` opens the context; the orchestrator narrows it to
/// its own stage and keeps the correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct TraceContext {
    pub workflow: &'static str,
    pub stage: Option<&'static str>,
    pub correlation_id: CorrelationId,
    pub started_at: DateTime<Utc>,
}

impl TraceContext {
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            stage: None,
            correlation_id: CorrelationId::new(),
            started_at: Utc::now(),
        }
    }

    pub fn stage(&self, stage: &'static str) -> Self {
        Self {
            stage: Some(stage),
            started_at: Utc::now(),
            ..self.clone()
        }
    }

    /// `workflow` or `workflow/stage`
    pub fn label(&self) -> String {
        match self.stage {
            Some(stage) => format!("{}/{stage}", self.workflow),
            None => self.workflow.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_keeps_correlation() {
        let root = TraceContext::new("swap");
        let submit = root.stage("orchestrate");

        assert_eq!(submit.correlation_id, root.correlation_id);
        assert_eq!(submit.workflow, "swap");
        assert_eq!(root.label(), "swap");
        assert_eq!(submit.label(), "swap/orchestrate");
        assert_ne!(CorrelationId::new(), root.correlation_id);
    }

    #[test]
    fn test_correlation_id_serializes_as_uuid_text() {
        let id = CorrelationId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
