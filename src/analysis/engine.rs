//! Audio analysis engine backed by symphonia and stratum-dsp

use super::decode::decode_to_mono;
use super::energy::{amplitude_stats, rolling_rms};
use super::metadata::display_name;
use super::tempo::detect_bpm;
use super::traits::{AnalysisEngine, Checkpoint, EngineOutcome, ProgressSink};
use crate::config::AnalysisConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Engine that decodes the file once and extracts every feature from it
#[derive(Debug, Clone)]
pub struct SymphoniaEngine {
    /// Minimum BPM for range folding
    min_bpm: f32,
    /// Maximum BPM for range folding
    max_bpm: f32,
    /// Seconds of audio analyzed for tempo
    tempo_seconds: u32,
}

impl SymphoniaEngine {
    pub fn new() -> Self {
        Self {
            min_bpm: 70.0,
            max_bpm: 170.0,
            tempo_seconds: 120,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new()
            .with_bpm_range(config.min_bpm, config.max_bpm)
            .with_tempo_seconds(config.tempo_seconds)
    }

    /// Create engine with custom BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    pub fn with_tempo_seconds(mut self, seconds: u32) -> Self {
        self.tempo_seconds = seconds;
        self
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine for SymphoniaEngine {
    fn analyze(
        &self,
        path: &Path,
        window_seconds: u32,
        hop_seconds: u32,
        progress: &dyn ProgressSink,
    ) -> Result<EngineOutcome> {
        log::debug!("Analyzing: {:?}", path);

        progress.checkpoint(Checkpoint::Loading)?;
        let audio = decode_to_mono(path, progress)?;
        let display_name = display_name(path);
        let amplitude = amplitude_stats(&audio.samples);

        progress.checkpoint(Checkpoint::Tempo)?;
        let bpm = detect_bpm(
            &audio.samples,
            audio.sample_rate,
            self.tempo_seconds,
            self.min_bpm,
            self.max_bpm,
        )
        .with_context(|| format!("Tempo detection failed for {:?}", path))?;

        progress.checkpoint(Checkpoint::Energy)?;
        let profile = rolling_rms(
            &audio.samples,
            audio.sample_rate,
            window_seconds,
            hop_seconds,
        )?;

        progress.checkpoint(Checkpoint::Finalizing)?;
        log::info!(
            "Analysis complete: {} ({:.1}s) BPM={:.1}, max={:.3}, avg={:.3}, {} windows",
            display_name,
            audio.duration_secs(),
            bpm,
            amplitude.max,
            amplitude.mean,
            profile.levels.len()
        );

        Ok(EngineOutcome {
            display_name,
            bpm,
            max_amplitude: amplitude.max,
            avg_amplitude: amplitude.mean,
            times: profile.times,
            energy_levels: profile.levels,
        })
    }
}
