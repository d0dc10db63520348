//! External change analyzer seam
//!
//! The AI validator is a collaborator that may be slow, may fail, and must
//! never sit on the critical path for structural validity. Calls are bounded
//! by a timeout and every failure mode is downgraded to a warning inside the
//! report the proposal carries.

use async_trait::async_trait;
use sge_substrate::{Operation, ValidatorReport};
use std::time::Duration;

/// Failure of the external analyzer; always downgraded, never propagated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("analyzer error: {0}")]
pub struct AnalyzerError(pub String);

/// Contract of the external validator service
#[async_trait]
pub trait ChangeAnalyzer: Send + Sync {
    /// Analyze the proposed operations
    async fn analyze(&self, ops: &[Operation]) -> Result<ValidatorReport, AnalyzerError>;
}

/// Run the analyzer with a timeout; any failure becomes a warning report.
pub async fn analyze_bounded(
    analyzer: &dyn ChangeAnalyzer,
    ops: &[Operation],
    timeout: Duration,
) -> ValidatorReport {
    match tokio::time::timeout(timeout, analyzer.analyze(ops)).await {
        Ok(Ok(report)) => report,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "analyzer failed, recording as warning");
            ValidatorReport::warning_only(format!("validator unavailable: {err}"))
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "analyzer timed out");
            ValidatorReport::warning_only(format!(
                "validator timed out after {}ms",
                timeout.as_millis()
            ))
        }
    }
}
