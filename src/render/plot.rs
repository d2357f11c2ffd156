//! Power-over-time plot model
//!
//! Tracks mastered with ~-6 dBFS headroom peak around 0.25 RMS, so those get
//! the finer [0, 0.3] colour scale. Anything louder uses [0, 0.6].

use super::RenderConfig;
use std::path::Path;

/// Peak level above which the loud scale is used
pub const LOUD_THRESHOLD: f64 = 0.3;

/// Vertical scale / colour normalisation of a power plot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerScale {
    /// [0, 0.3]
    Standard,
    /// [0, 0.6]
    Loud,
}

impl PowerScale {
    /// Pick the scale for a set of energy levels
    pub fn for_levels(levels: &[f64]) -> Self {
        let peak = levels.iter().copied().fold(0.0, f64::max);
        if peak > LOUD_THRESHOLD {
            PowerScale::Loud
        } else {
            PowerScale::Standard
        }
    }

    pub fn max(self) -> f64 {
        match self {
            PowerScale::Standard => 0.3,
            PowerScale::Loud => 0.6,
        }
    }

    pub fn range(self) -> (f64, f64) {
        (0.0, self.max())
    }

    /// Map a level into [0, 1] on this scale
    pub fn normalize(self, level: f64) -> f64 {
        (level / self.max()).clamp(0.0, 1.0)
    }
}

/// One filled segment of the plot
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBand {
    pub start: f64,
    pub end: f64,
    pub level: f64,
    pub color: [u8; 3],
}

/// Renderer output, ready to be drawn by a presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayArtifact {
    pub title: String,
    pub scale: PowerScale,
    pub bands: Vec<EnergyBand>,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub colorbar_label: &'static str,
    pub(super) config: RenderConfig,
}

impl DisplayArtifact {
    /// Time span covered by the bands
    pub fn time_span(&self) -> (f64, f64) {
        match (self.bands.first(), self.bands.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (0.0, 0.0),
        }
    }
}

/// "autumn" colour map: red at 0, yellow at 1
pub fn autumn(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [255, (t * 255.0).round() as u8, 0]
}

/// Pure, deterministic renderer for energy profiles
#[derive(Debug, Clone, Default)]
pub struct PlotRenderer {
    config: RenderConfig,
}

impl PlotRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Build the plot for `times`/`energy_levels`, titled after `label`
    ///
    /// One band per consecutive pair of times, filled to the level of its
    /// left edge.
    pub fn render(&self, times: &[f64], energy_levels: &[f64], label: &str) -> DisplayArtifact {
        let scale = PowerScale::for_levels(energy_levels);

        let bands = times
            .windows(2)
            .zip(energy_levels.iter())
            .map(|(span, &level)| EnergyBand {
                start: span[0],
                end: span[1],
                level,
                color: autumn(scale.normalize(level)),
            })
            .collect();

        let title = Path::new(label)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| label.to_string());

        DisplayArtifact {
            title,
            scale,
            bands,
            x_label: "Time (seconds)",
            y_label: "Power",
            colorbar_label: "RMS Power",
            config: self.config.clone(),
        }
    }
}
