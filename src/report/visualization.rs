use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use log::info;
use ndarray::Array2;

use crate::{
    error::{ChangeError, Result},
    image_utils::{array_to_gray, mean_abs_difference, normalize_to_u8},
    raster::RasterImage,
};

#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    /// Mean absolute difference above which the comparison mask lights up.
    pub comparison_threshold: f64,
    pub separator_width: u32,
    pub parallel: bool,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            comparison_threshold: 30.0,
            separator_width: 4,
            parallel: true,
        }
    }
}

pub struct Visualizer {
    config: VisualizationConfig,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            config: VisualizationConfig::default(),
        }
    }

    pub fn with_config(config: VisualizationConfig) -> Self {
        Self { config }
    }

    /// Colors a gray image through the hot ramp: black, red, yellow, white.
    pub fn create_heatmap(&self, gray: &GrayImage) -> RgbImage {
        let (width, height) = gray.dimensions();
        let mut heatmap = RgbImage::new(width, height);

        for (x, y, pixel) in gray.enumerate_pixels() {
            let intensity = pixel[0] as f32 / 255.0;
            heatmap.put_pixel(x, y, intensity_to_color(intensity));
        }

        heatmap
    }

    fn magnitude(&self, before: &RasterImage, after: &RasterImage) -> Result<Array2<f64>> {
        before.ensure_same_shape(after)?;
        mean_abs_difference(before.to_pixel_major(), after.to_pixel_major(), self.config.parallel)
    }

    /// Band-averaged absolute difference stretched to the full color ramp.
    pub fn change_map(&self, before: &RasterImage, after: &RasterImage) -> Result<RgbImage> {
        let magnitude = self.magnitude(before, after)?;
        let stretched = normalize_to_u8(magnitude.view())?;
        Ok(self.create_heatmap(&array_to_gray(&stretched)))
    }

    pub fn render_change_map<P: AsRef<Path>>(
        &self,
        before: &RasterImage,
        after: &RasterImage,
        path: P,
    ) -> Result<PathBuf> {
        let map = self.change_map(before, after)?;
        save_image(&map, path.as_ref())
    }

    /// Before, after and a binary change mask side by side.
    pub fn comparison_panel(&self, before: &RasterImage, after: &RasterImage) -> Result<RgbImage> {
        let magnitude = self.magnitude(before, after)?;
        let threshold = self.config.comparison_threshold;
        let mask = magnitude.mapv(|m| if m > threshold { 255.0 } else { 0.0 });
        let mask = self.create_heatmap(&array_to_gray(&mask));

        let (width, height) = mask.dimensions();
        let gap = self.config.separator_width;
        let mut canvas = RgbImage::new(width * 3 + gap * 2, height);

        let panels = [raster_preview(before)?, raster_preview(after)?, mask];
        for (i, panel) in panels.iter().enumerate() {
            let x = i as u32 * (width + gap);
            imageops::replace(&mut canvas, panel, x as i64, 0);

            if i > 0 && gap > 0 {
                let bar = Rect::at((x - gap) as i32, 0).of_size(gap, height);
                draw_filled_rect_mut(&mut canvas, bar, Rgb([255, 255, 255]));
            }
        }

        Ok(canvas)
    }

    pub fn render_comparison<P: AsRef<Path>>(
        &self,
        before: &RasterImage,
        after: &RasterImage,
        path: P,
    ) -> Result<PathBuf> {
        let panel = self.comparison_panel(before, after)?;
        save_image(&panel, path.as_ref())
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

fn intensity_to_color(intensity: f32) -> Rgb<u8> {
    const RED_END: f32 = 0.365079;
    const GREEN_END: f32 = 0.746032;

    let t = intensity.clamp(0.0, 1.0);
    let r = (t / RED_END).clamp(0.0, 1.0);
    let g = ((t - RED_END) / (GREEN_END - RED_END)).clamp(0.0, 1.0);
    let b = ((t - GREEN_END) / (1.0 - GREEN_END)).clamp(0.0, 1.0);

    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

/// Natural-color preview: red, green, blue bands each stretched on their own.
/// Rasters with fewer than 3 bands show band 0 as gray.
pub fn raster_preview(raster: &RasterImage) -> Result<RgbImage> {
    let (width, height) = (raster.width() as u32, raster.height() as u32);
    let channels = raster.rgb_bands().unwrap_or([0, 0, 0]);

    let stretched = channels
        .iter()
        .map(|&band| normalize_to_u8(raster.band(band)).map(|arr| array_to_gray(&arr)))
        .collect::<Result<Vec<GrayImage>>>()?;

    let mut preview = RgbImage::new(width, height);
    for (x, y, pixel) in preview.enumerate_pixels_mut() {
        let Luma([r]) = *stretched[0].get_pixel(x, y);
        let Luma([g]) = *stretched[1].get_pixel(x, y);
        let Luma([b]) = *stretched[2].get_pixel(x, y);
        *pixel = Rgb([r, g, b]);
    }

    Ok(preview)
}

fn save_image(image: &RgbImage, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ChangeError::Render(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    image
        .save(path)
        .map_err(|e| ChangeError::Render(format!("cannot write {}: {}", path.display(), e)))?;

    info!("Saved change visualization to {}", path.display());
    Ok(path.to_path_buf())
}
