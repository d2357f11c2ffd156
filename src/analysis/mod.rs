//! Audio analysis layer
//!
//! The orchestrator only sees the `AnalysisEngine` trait. `SymphoniaEngine`
//! is the real implementation: symphonia decodes, stratum-dsp finds the
//! tempo, and the energy profile is a rolling RMS over the decoded signal.

mod decode;
mod energy;
mod engine;
mod metadata;
mod tempo;
mod traits;

pub use decode::{decode_to_mono, MonoAudio};
pub use energy::{amplitude_stats, rolling_rms, AmplitudeStats, EnergyProfile};
pub use engine::SymphoniaEngine;
pub use metadata::display_name;
pub use tempo::{detect_bpm, fold_into_range};
pub use traits::{AnalysisEngine, Checkpoint, EngineOutcome, NoProgress, ProgressSink};
