//! Data model shared by the engine, the orchestrator and the front end

mod request;
mod result;

pub use request::{
    file_identity, AnalysisParams, AnalysisRequest, DEFAULT_HOP_SECONDS, DEFAULT_WINDOW_SECONDS,
};
pub use result::{AnalysisResult, NO_ANALYSIS_TEXT};
