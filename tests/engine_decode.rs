mod helpers;

use crossbeam_channel::Receiver;
use helpers::{click_track, sine, touch, write_wav};
use mastering_toolkit::analysis::{
    amplitude_stats, decode_to_mono, rolling_rms, AnalysisEngine, NoProgress,
};
use mastering_toolkit::orchestrator::ChannelObserver;
use mastering_toolkit::{AnalysisEvent, AnalysisOrchestrator, AnalysisParams, SymphoniaEngine};
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 8000;
const CLICK_RATE: u32 = 22050;
const WAIT: Duration = Duration::from_secs(120);

fn tone(seconds: u32, amplitude: f32) -> Vec<f32> {
    sine(seconds, SAMPLE_RATE, 440.0, amplitude)
}

fn real_orchestrator() -> (AnalysisOrchestrator<SymphoniaEngine>, Receiver<AnalysisEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut orch = AnalysisOrchestrator::new(SymphoniaEngine::new());
    orch.subscribe(ChannelObserver::new(tx));
    (orch, rx)
}

#[test]
fn test_decode_wav_to_mono() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, SAMPLE_RATE, &tone(4, 0.5));

    let audio = decode_to_mono(&path, &NoProgress).unwrap();
    assert_eq!(audio.sample_rate, SAMPLE_RATE);
    assert_eq!(audio.samples.len(), 4 * SAMPLE_RATE as usize);
    assert!((audio.duration_secs() - 4.0).abs() < 1e-6);

    let stats = amplitude_stats(&audio.samples);
    assert!((stats.max - 0.5).abs() < 0.01);
    // Mean of |sin| is 2/pi of the amplitude
    assert!((stats.mean - 0.5 * 2.0 / std::f64::consts::PI).abs() < 0.01);
}

#[test]
fn test_energy_profile_of_decoded_tone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, SAMPLE_RATE, &tone(4, 0.5));

    let audio = decode_to_mono(&path, &NoProgress).unwrap();
    let profile = rolling_rms(&audio.samples, audio.sample_rate, 2, 1).unwrap();

    assert_eq!(profile.times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(profile.levels.len(), profile.times.len());

    // Frame 2 lies fully inside the signal: RMS of a sine is amplitude/sqrt(2)
    let expected = 0.5 / 2f64.sqrt();
    assert!((profile.levels[2] - expected).abs() < 0.01);

    // Edge frames are half padding
    assert!(profile.levels[0] < profile.levels[2]);
    assert!(profile.levels[4] < profile.levels[2]);
}

#[test]
fn test_engine_rejects_garbage_file() {
    let dir = TempDir::new().unwrap();
    let path = touch(dir.path(), "garbage.mp3");

    let engine = SymphoniaEngine::new();
    assert!(engine.analyze(&path, 10, 2, &NoProgress).is_err());
}

#[test]
fn test_orchestrator_reports_decode_failure() {
    let dir = TempDir::new().unwrap();
    let path = touch(dir.path(), "garbage.flac");

    let (mut orch, rx) = real_orchestrator();

    orch.analyze(&path).unwrap();
    assert!(orch.wait_for_idle(WAIT));

    let failure = rx.try_iter().find_map(|event| match event {
        AnalysisEvent::Failed { error, .. } => Some(error),
        _ => None,
    });
    let error = failure.expect("decode failure should be reported");
    assert!(error.starts_with("Analysis failed: "));
    assert!(!orch.is_analyzed(&path));
}

#[test]
fn test_real_engine_completes_click_track() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("click.wav");
    let seconds = 8;
    write_wav(&path, CLICK_RATE, &click_track(seconds, CLICK_RATE, 120.0));

    let (mut orch, rx) = real_orchestrator();
    let handle = orch
        .request_analysis(&path, AnalysisParams::new(4, 2))
        .unwrap();
    assert!(orch.wait_for_idle(WAIT));

    let events: Vec<AnalysisEvent> = rx.try_iter().collect();
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![10, 30, 60, 90, 100]);

    let result = match events.last() {
        Some(AnalysisEvent::Completed {
            handle: done,
            result,
            ..
        }) if *done == handle => result.clone(),
        other => panic!("expected completion, got {:?}", other),
    };

    // No tags in a bare WAV: the file name is shown
    assert_eq!(result.display_name, "click.wav");

    let n = (seconds * CLICK_RATE) as usize;
    let hop = (2 * CLICK_RATE) as usize;
    assert_eq!(result.times.len(), 1 + n / hop);
    assert_eq!(result.energy_levels.len(), result.times.len());
    assert_eq!(result.times, vec![0.0, 2.0, 4.0, 6.0, 8.0]);

    assert!(result.bpm.is_finite());
    assert!(result.bpm == 0.0 || (70.0..=170.0).contains(&result.bpm));
    assert!(result.max_amplitude > 0.5 && result.max_amplitude <= 1.0);

    assert_eq!(orch.get_cached_result(&path), Some(&result));
}

#[test]
fn test_real_engine_run_is_superseded() {
    let dir = TempDir::new().unwrap();
    let long = dir.path().join("long.wav");
    let short = dir.path().join("short.wav");
    write_wav(&long, 44100, &sine(200, 44100, 220.0, 0.5));
    write_wav(&short, CLICK_RATE, &click_track(4, CLICK_RATE, 120.0));

    let (mut orch, rx) = real_orchestrator();

    let handle_long = orch.analyze(&long).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    let handle_short = orch.analyze(&short).unwrap();
    assert!(orch.wait_for_idle(WAIT));

    let events: Vec<AnalysisEvent> = rx.try_iter().collect();
    let terminal: Vec<&AnalysisEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].handle(), Some(handle_short));
    assert!(matches!(terminal[0], AnalysisEvent::Completed { .. }));
    assert!(events
        .iter()
        .all(|e| e.handle() != Some(handle_long) || !e.is_terminal()));

    assert!(!orch.is_analyzed(&long));
    assert!(orch.is_analyzed(&short));
    assert_eq!(orch.cached_count(), 1);
}
