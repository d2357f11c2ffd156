//! Analysis requests and their window/hop parameters

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default rolling RMS window length in seconds
pub const DEFAULT_WINDOW_SECONDS: u32 = 10;

/// Default rolling RMS hop length in seconds
pub const DEFAULT_HOP_SECONDS: u32 = 2;

/// Window and hop lengths for the rolling energy profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisParams {
    /// Length of the rolling RMS window in seconds
    pub window_seconds: u32,

    /// Distance between consecutive windows in seconds
    pub hop_seconds: u32,
}

impl AnalysisParams {
    pub fn new(window_seconds: u32, hop_seconds: u32) -> Self {
        Self {
            window_seconds,
            hop_seconds,
        }
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS, DEFAULT_HOP_SECONDS)
    }
}

impl fmt::Display for AnalysisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window={}s hop={}s", self.window_seconds, self.hop_seconds)
    }
}

/// A single request to analyze one audio file
///
/// Immutable once created. The core does not enforce `hop <= window`;
/// the engine decides which parameter combinations are legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    path: PathBuf,
    file_identity: String,
    params: AnalysisParams,
}

impl AnalysisRequest {
    pub fn new(path: impl AsRef<Path>, params: AnalysisParams) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_identity = file_identity(&path);
        Self {
            path,
            file_identity,
            params,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_identity(&self) -> &str {
        &self.file_identity
    }

    pub fn params(&self) -> AnalysisParams {
        self.params
    }

    pub fn window_seconds(&self) -> u32 {
        self.params.window_seconds
    }

    pub fn hop_seconds(&self) -> u32 {
        self.params.hop_seconds
    }
}

/// Cache key for a file: the path exactly as the caller spelled it
pub fn file_identity(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}
