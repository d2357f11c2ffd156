//! Mastering Toolkit - background audio analysis with a single-flight orchestrator
//!
//! This library analyzes audio files (tempo, amplitude statistics, rolling
//! energy profile) on a worker thread while the caller's thread stays
//! responsive, caches completed results, and reports progress to observers.

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod render;

pub use analysis::{AnalysisEngine, SymphoniaEngine};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use model::{AnalysisParams, AnalysisRequest, AnalysisResult};
pub use orchestrator::{AnalysisEvent, AnalysisObserver, AnalysisOrchestrator};
