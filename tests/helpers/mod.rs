//! Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use mastering_toolkit::analysis::{AnalysisEngine, Checkpoint, EngineOutcome, ProgressSink};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long a gated run waits for cancellation
const GATE_LIMIT: Duration = Duration::from_secs(10);

/// What the scripted engine does for one path
#[derive(Debug, Clone)]
pub enum Script {
    Succeed(EngineOutcome),
    Fail(String),
    Panic(String),
}

/// Engine driven by per-path scripts
///
/// Gated paths block after the first checkpoint until the run is cancelled
/// or the path is released.
/// Paths without a script succeed with `default_outcome`.
pub struct ScriptedEngine {
    scripts: Mutex<HashMap<PathBuf, Script>>,
    gated: Mutex<HashSet<PathBuf>>,
    calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    entered_tx: Sender<PathBuf>,
    entered_rx: Receiver<PathBuf>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        Self {
            scripts: Mutex::new(HashMap::new()),
            gated: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            entered_tx,
            entered_rx,
        }
    }

    pub fn with_script(self, path: impl AsRef<Path>, script: Script) -> Self {
        self.set_script(path, script);
        self
    }

    pub fn with_gate(self, path: impl AsRef<Path>) -> Self {
        self.gated.lock().unwrap().insert(path.as_ref().to_path_buf());
        self
    }

    /// Let a blocked run on `path` carry on
    pub fn release(&self, path: impl AsRef<Path>) {
        self.gated.lock().unwrap().remove(path.as_ref());
    }

    fn is_gated(&self, path: &Path) -> bool {
        self.gated.lock().unwrap().contains(path)
    }

    pub fn set_script(&self, path: impl AsRef<Path>, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Block until the engine has been entered for `path`
    pub fn wait_entered(&self, path: &Path) {
        let deadline = Instant::now() + GATE_LIMIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.entered_rx.recv_timeout(remaining) {
                Ok(entered) if entered == path => return,
                Ok(_) => continue,
                Err(_) => panic!("engine never entered {:?}", path),
            }
        }
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn analyze(
        &self,
        path: &Path,
        _window_seconds: u32,
        _hop_seconds: u32,
        progress: &dyn ProgressSink,
    ) -> Result<EngineOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let _ = self.entered_tx.send(path.to_path_buf());
        progress.checkpoint(Checkpoint::Loading)?;

        let started = Instant::now();
        while self.is_gated(path) && !progress.is_cancelled() && started.elapsed() < GATE_LIMIT {
            thread::sleep(Duration::from_millis(5));
        }

        progress.checkpoint(Checkpoint::Tempo)?;
        progress.checkpoint(Checkpoint::Energy)?;
        progress.checkpoint(Checkpoint::Finalizing)?;

        let script = self.scripts.lock().unwrap().get(path).cloned();
        match script {
            Some(Script::Succeed(outcome)) => Ok(outcome),
            Some(Script::Fail(message)) => anyhow::bail!(message),
            Some(Script::Panic(message)) => panic!("{}", message),
            None => Ok(default_outcome(path)),
        }
    }
}

pub fn default_outcome(path: &Path) -> EngineOutcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    EngineOutcome {
        display_name: name,
        bpm: 120.0,
        max_amplitude: 0.5,
        avg_amplitude: 0.2,
        times: vec![0.0, 2.0, 4.0],
        energy_levels: vec![0.1, 0.2, 0.1],
    }
}

/// Create an empty placeholder file the orchestrator will accept
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"placeholder").unwrap();
    path
}

/// Write a mono 16-bit PCM WAV file
pub fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let data_len = (samples.len() * 2) as u32;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fs::write(path, bytes).unwrap();
}

/// Mono click track: a short decaying noise burst on every beat
pub fn click_track(seconds: u32, sample_rate: u32, bpm: f32) -> Vec<f32> {
    let total = (seconds * sample_rate) as usize;
    let beat = (sample_rate as f32 * 60.0 / bpm) as usize;
    let burst = (sample_rate / 50) as usize;
    let mut seed: u32 = 0x1234_5678;

    (0..total)
        .map(|i| {
            let offset = i % beat;
            if offset >= burst {
                return 0.0;
            }
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            let decay = 1.0 - offset as f32 / burst as f32;
            0.8 * noise * decay
        })
        .collect()
}

/// Steady sine tone
pub fn sine(seconds: u32, sample_rate: u32, freq: f32, amplitude: f32) -> Vec<f32> {
    (0..seconds * sample_rate)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}
