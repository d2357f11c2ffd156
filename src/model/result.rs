//! Analysis results and their text summary

use crate::analysis::EngineOutcome;
use serde::Serialize;

/// Text shown for a file that has no cached analysis
pub const NO_ANALYSIS_TEXT: &str = "No analysis data available";

/// Complete analysis result for one file
///
/// Successful results are owned by the result cache once the worker hands
/// them over. Failed results are only built for reporting and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Cache key of the analyzed file
    pub file_identity: String,

    /// "Artist - Title" from tags, or the file name
    pub display_name: String,

    /// Detected tempo in beats per minute
    pub bpm: f64,

    /// Peak absolute sample value (0.0-1.0)
    pub max_amplitude: f64,

    /// Mean absolute sample value (0.0-1.0)
    pub avg_amplitude: f64,

    /// Start time of each energy window in seconds
    pub times: Vec<f64>,

    /// RMS energy per window, same length as `times`
    pub energy_levels: Vec<f64>,

    pub succeeded: bool,

    pub error: Option<String>,
}

impl AnalysisResult {
    /// Build a successful result from an engine outcome
    pub fn from_outcome(file_identity: impl Into<String>, outcome: EngineOutcome) -> Self {
        Self {
            file_identity: file_identity.into(),
            display_name: outcome.display_name,
            bpm: outcome.bpm,
            max_amplitude: outcome.max_amplitude,
            avg_amplitude: outcome.avg_amplitude,
            times: outcome.times,
            energy_levels: outcome.energy_levels,
            succeeded: true,
            error: None,
        }
    }

    /// Build a failed result carrying only the error message
    pub fn failed(file_identity: impl Into<String>, error: impl Into<String>) -> Self {
        let file_identity = file_identity.into();
        let display_name = std::path::Path::new(&file_identity)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_identity.clone());

        Self {
            file_identity,
            display_name,
            bpm: 0.0,
            max_amplitude: 0.0,
            avg_amplitude: 0.0,
            times: Vec::new(),
            energy_levels: Vec::new(),
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// Human-readable summary of the track metadata
    pub fn display_text(&self) -> String {
        format!(
            "Track: {}\nBPM: {:.1}\nMax Amplitude: {:.3}\nAvg Amplitude: {:.3}",
            self.display_name, self.bpm, self.max_amplitude, self.avg_amplitude
        )
    }

    /// Highest energy level in the profile (0.0 for an empty profile)
    pub fn peak_energy(&self) -> f64 {
        self.energy_levels.iter().copied().fold(0.0, f64::max)
    }
}
