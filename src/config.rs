//! Analysis configuration

use crate::model::AnalysisParams;
use crate::render::RenderConfig;

/// Configuration shared by the engine, the orchestrator and the renderer
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Window/hop used when a request does not specify its own
    pub params: AnalysisParams,

    /// Lower bound of the BPM folding range
    pub min_bpm: f32,

    /// Upper bound of the BPM folding range
    pub max_bpm: f32,

    /// Seconds of audio handed to tempo detection
    pub tempo_seconds: u32,

    /// Power plot rasterization settings
    pub render: RenderConfig,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self {
            params: AnalysisParams::default(),
            min_bpm: 70.0,
            max_bpm: 170.0,
            tempo_seconds: 120,
            render: RenderConfig::default(),
        }
    }

    /// Set default window/hop lengths
    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    /// Set BPM folding range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    /// Limit how much audio tempo detection looks at
    pub fn with_tempo_seconds(mut self, seconds: u32) -> Self {
        self.tempo_seconds = seconds;
        self
    }

    /// Set plot rendering options
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}
