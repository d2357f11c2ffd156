//! Completed analysis results keyed by file identity

use crate::model::AnalysisResult;
use std::collections::HashMap;

/// Lookup-only store of successful results
///
/// Has no synchronization of its own; the orchestrator owns it and is the
/// only writer.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, AnalysisResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any previous one for the same identity
    pub fn put(&mut self, identity: impl Into<String>, result: AnalysisResult) -> Option<AnalysisResult> {
        self.entries.insert(identity.into(), result)
    }

    pub fn get(&self, identity: &str) -> Option<&AnalysisResult> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn remove(&mut self, identity: &str) -> Option<AnalysisResult> {
        self.entries.remove(identity)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EngineOutcome;

    fn result(identity: &str, bpm: f64) -> AnalysisResult {
        AnalysisResult::from_outcome(
            identity,
            EngineOutcome {
                display_name: identity.to_string(),
                bpm,
                max_amplitude: 0.5,
                avg_amplitude: 0.1,
                times: vec![0.0, 2.0],
                energy_levels: vec![0.1, 0.2],
            },
        )
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = ResultCache::new();
        assert!(cache.put("a.mp3", result("a.mp3", 120.0)).is_none());

        let previous = cache.put("a.mp3", result("a.mp3", 128.0));
        assert_eq!(previous.map(|r| r.bpm), Some(120.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a.mp3").map(|r| r.bpm), Some(128.0));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = ResultCache::new();
        cache.put("a.mp3", result("a.mp3", 120.0));
        cache.put("b.mp3", result("b.mp3", 90.0));

        assert!(cache.remove("a.mp3").is_some());
        assert!(!cache.contains("a.mp3"));
        assert!(cache.contains("b.mp3"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("b.mp3").is_none());
    }
}
