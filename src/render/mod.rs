//! Rendering of energy profiles into power plots

mod plot;
mod raster;

pub use plot::{autumn, DisplayArtifact, EnergyBand, PlotRenderer, PowerScale, LOUD_THRESHOLD};

/// Canvas settings for rasterized plots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Image width in pixels, colour bar included
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Width of the colour bar strip on the right
    pub colorbar_width: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 400,
            colorbar_width: 30,
        }
    }
}
