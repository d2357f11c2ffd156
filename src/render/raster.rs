//! Rasterization of power plots with the `image` crate

use super::plot::{autumn, DisplayArtifact};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

impl DisplayArtifact {
    /// Draw the plot into an RGB image sized by the render config
    ///
    /// The rightmost `colorbar_width` columns hold the colour scale.
    pub fn to_image(&self) -> RgbImage {
        let width = self.config.width.max(1);
        let height = self.config.height.max(1);
        let colorbar = self.config.colorbar_width.min(width.saturating_sub(1));
        let plot_width = width - colorbar;

        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

        let (t0, t1) = self.time_span();
        let span = t1 - t0;

        if span > 0.0 && plot_width > 0 {
            for band in &self.bands {
                let x_start = ((band.start - t0) / span * plot_width as f64).floor() as u32;
                let x_end = ((band.end - t0) / span * plot_width as f64).ceil() as u32;
                let bar = (self.scale.normalize(band.level) * height as f64).round() as u32;

                for x in x_start.min(plot_width)..x_end.min(plot_width) {
                    for y in (height - bar.min(height))..height {
                        img.put_pixel(x, y, Rgb(band.color));
                    }
                }
            }
        }

        // Colour bar, top = scale max
        for y in 0..height {
            let t = 1.0 - y as f64 / (height.max(2) - 1) as f64;
            let color = Rgb(autumn(t));
            for x in plot_width..width {
                img.put_pixel(x, y, color);
            }
        }

        img
    }

    /// Write the plot as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create plot directory: {:?}", parent))?;
            }
        }

        self.to_image()
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write plot: {:?}", path))?;

        log::debug!("Plot written to {:?}", path);
        Ok(())
    }
}
