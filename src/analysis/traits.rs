//! Analysis trait definitions and data structures

use crate::error::AnalysisError;
use anyhow::Result;
use std::path::Path;

/// Audio analysis engine - allows swapping the real engine for scripted ones
///
/// Called from a worker thread, never from the control thread. Implementations
/// must not touch presentation state.
pub trait AnalysisEngine: Send + Sync {
    /// Decode one file and extract tempo, amplitude and energy features.
    ///
    /// Report each stage through `progress.checkpoint(..)?` so a superseded
    /// run stops at the next checkpoint.
    fn analyze(
        &self,
        path: &Path,
        window_seconds: u32,
        hop_seconds: u32,
        progress: &dyn ProgressSink,
    ) -> Result<EngineOutcome>;
}

/// Raw features produced by an engine for one file
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    pub display_name: String,
    pub bpm: f64,
    pub max_amplitude: f64,
    pub avg_amplitude: f64,
    pub times: Vec<f64>,
    pub energy_levels: Vec<f64>,
}

/// Fixed progress checkpoints an engine passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Loading,
    Tempo,
    Energy,
    Finalizing,
}

impl Checkpoint {
    pub fn percent(self) -> u8 {
        match self {
            Checkpoint::Loading => 10,
            Checkpoint::Tempo => 30,
            Checkpoint::Energy => 60,
            Checkpoint::Finalizing => 90,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Checkpoint::Loading => "Loading audio",
            Checkpoint::Tempo => "Detecting tempo",
            Checkpoint::Energy => "Computing energy profile",
            Checkpoint::Finalizing => "Finalizing results",
        }
    }
}

/// Progress channel handed to an engine for one run
pub trait ProgressSink {
    /// Report reaching `checkpoint`. Fails with `AnalysisError::Cancelled`
    /// once the run has been superseded.
    fn checkpoint(&self, checkpoint: Checkpoint) -> Result<(), AnalysisError>;

    /// Poll for cancellation between checkpoints
    fn is_cancelled(&self) -> bool;
}

/// Sink for running an engine outside a worker (never cancels, reports nothing)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn checkpoint(&self, checkpoint: Checkpoint) -> Result<(), AnalysisError> {
        log::trace!("{} ({}%)", checkpoint.message(), checkpoint.percent());
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoints_are_monotonic() {
        let stages = [
            Checkpoint::Loading,
            Checkpoint::Tempo,
            Checkpoint::Energy,
            Checkpoint::Finalizing,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].percent() < pair[1].percent());
        }
        assert!(Checkpoint::Finalizing.percent() < 100);
    }
}
