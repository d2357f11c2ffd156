//! Error types surfaced by the analysis orchestrator

use thiserror::Error;

/// Errors reported for an analysis request
///
/// Only `NotFound`, `EngineFailure` and `WorkerSpawn` ever reach observers.
/// `Cancelled` is the internal signal a superseded worker unwinds with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Analysis failed: {0}")]
    EngineFailure(String),

    #[error("Failed to start analysis worker: {0}")]
    WorkerSpawn(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// True if an `anyhow` error chain bottoms out in a cancellation
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<AnalysisError>(),
                Some(AnalysisError::Cancelled)
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AnalysisError::NotFound("missing.mp3".to_string()).to_string(),
            "File not found: missing.mp3"
        );
        assert_eq!(
            AnalysisError::EngineFailure("bad header".to_string()).to_string(),
            "Analysis failed: bad header"
        );
    }

    #[test]
    fn test_cancellation_detected_through_context() {
        let err: anyhow::Result<()> = Err(AnalysisError::Cancelled.into());
        let err = err.context("while decoding").unwrap_err();
        assert!(AnalysisError::is_cancellation(&err));

        let other = anyhow::anyhow!("decode error");
        assert!(!AnalysisError::is_cancellation(&other));
    }
}
