//! Amplitude statistics and rolling-window RMS energy

use anyhow::Result;

/// Peak and mean absolute amplitude of a signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeStats {
    pub max: f64,
    pub mean: f64,
}

/// Rolling RMS energy over time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnergyProfile {
    /// Centre time of each window in seconds
    pub times: Vec<f64>,
    /// RMS value of each window
    pub levels: Vec<f64>,
}

/// Compute peak and mean absolute amplitude
pub fn amplitude_stats(samples: &[f32]) -> AmplitudeStats {
    if samples.is_empty() {
        return AmplitudeStats { max: 0.0, mean: 0.0 };
    }

    let mut max = 0.0f64;
    let mut sum = 0.0f64;
    for &sample in samples {
        let abs = sample.abs() as f64;
        sum += abs;
        if abs > max {
            max = abs;
        }
    }

    AmplitudeStats {
        max,
        mean: sum / samples.len() as f64,
    }
}

/// Rolling RMS with centred, zero-padded frames
///
/// Frame `i` is centred on sample `i * hop` and spans `window` seconds, so a
/// signal of `n` samples yields `1 + n / hop` frames. Samples outside the
/// signal count as silence.
pub fn rolling_rms(
    samples: &[f32],
    sample_rate: u32,
    window_seconds: u32,
    hop_seconds: u32,
) -> Result<EnergyProfile> {
    if window_seconds == 0 || hop_seconds == 0 {
        anyhow::bail!(
            "Window and hop must be positive (window={}s, hop={}s)",
            window_seconds,
            hop_seconds
        );
    }
    if sample_rate == 0 {
        anyhow::bail!("Sample rate must be positive");
    }

    let frame_len = window_seconds as usize * sample_rate as usize;
    let hop_len = hop_seconds as usize * sample_rate as usize;
    let n = samples.len();

    // Prefix sums of squares make each frame O(1)
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        acc += (s as f64) * (s as f64);
        prefix.push(acc);
    }

    let n_frames = 1 + n / hop_len;
    let half = (frame_len / 2) as i64;
    let mut times = Vec::with_capacity(n_frames);
    let mut levels = Vec::with_capacity(n_frames);

    for i in 0..n_frames {
        let start = (i * hop_len) as i64 - half;
        let end = start + frame_len as i64;
        let lo = start.clamp(0, n as i64) as usize;
        let hi = end.clamp(0, n as i64) as usize;

        let energy = prefix[hi] - prefix[lo];
        levels.push((energy / frame_len as f64).sqrt());
        times.push((i as u64 * hop_seconds as u64) as f64);
    }

    Ok(EnergyProfile { times, levels })
}
