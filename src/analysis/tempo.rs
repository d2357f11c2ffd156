//! Tempo detection using stratum-dsp
//!
//! stratum-dsp reports whatever octave its tempogram favours, so the raw BPM
//! is folded into the configured range by doubling or halving.

use anyhow::Result;
use stratum_dsp::{analyze_audio, AnalysisConfig};

/// Detect BPM from mono samples, analyzing at most `max_seconds` of audio
///
/// Returns 0.0 when stratum-dsp finds no tempo. Audio shorter than one second
/// is an error.
pub fn detect_bpm(
    samples: &[f32],
    sample_rate: u32,
    max_seconds: u32,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<f64> {
    if samples.len() < sample_rate as usize {
        anyhow::bail!("Audio too short for tempo detection");
    }

    let limit = (sample_rate as usize * max_seconds as usize).min(samples.len());
    let excerpt = &samples[..limit];

    let config = AnalysisConfig::default();
    let result = analyze_audio(excerpt, sample_rate, config)
        .map_err(|e| anyhow::anyhow!("Tempo detection failed: {:?}", e))?;

    // No usable tempo: report 0 BPM rather than failing the whole analysis
    if !result.bpm.is_finite() || result.bpm <= 0.0 {
        log::warn!("Could not detect BPM (raw value {})", result.bpm);
        return Ok(0.0);
    }

    let bpm = fold_into_range(result.bpm, min_bpm, max_bpm);
    log::debug!(
        "Tempo: raw {:.1} BPM, folded {:.1} BPM (confidence: {:.2})",
        result.bpm,
        bpm,
        result.bpm_confidence
    );

    Ok(bpm as f64)
}

/// Double or halve `bpm` until it lands inside `[min_bpm, max_bpm]`
pub fn fold_into_range(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    let mut bpm = bpm;
    if min_bpm > 0.0 && max_bpm > 0.0 && bpm > 0.0 && bpm.is_finite() {
        while bpm < min_bpm && bpm * 2.0 <= max_bpm {
            bpm *= 2.0;
        }
        while bpm > max_bpm && bpm / 2.0 >= min_bpm {
            bpm /= 2.0;
        }
    }
    bpm
}
