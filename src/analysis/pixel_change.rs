use log::debug;
use ndarray::Array2;
use statrs::statistics::Statistics;

use crate::{
    error::{ChangeError, Result},
    image_utils::{mean_abs_difference, percentage},
    raster::RasterImage,
};

pub const DEFAULT_THRESHOLD_FACTOR: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct PixelChangeResult {
    pub change_percentage: f64,
    /// `mean + k * std` of the change magnitudes.
    pub threshold: f64,
    pub mean_magnitude: f64,
    pub std_magnitude: f64,
    pub changed_pixels: usize,
    pub total_pixels: usize,
    pub magnitude: Array2<f64>,
}

/// Flags pixels whose band-averaged absolute difference exceeds an
/// adaptive `mean + k * std` threshold.
pub struct PixelChangeDetector {
    threshold_factor: f64,
    parallel: bool,
}

impl PixelChangeDetector {
    pub fn new(threshold_factor: f64) -> Result<Self> {
        if !threshold_factor.is_finite() {
            return Err(ChangeError::InvalidParameter(format!(
                "threshold factor must be finite, got {}",
                threshold_factor
            )));
        }

        Ok(Self {
            threshold_factor,
            parallel: true,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn detect(&self, before: &RasterImage, after: &RasterImage) -> Result<PixelChangeResult> {
        let magnitude = mean_abs_difference(before.to_pixel_major(), after.to_pixel_major(), self.parallel)?;

        let mean_magnitude = magnitude.iter().mean();
        let std_magnitude = magnitude.iter().population_std_dev();
        let threshold = mean_magnitude + self.threshold_factor * std_magnitude;

        let changed_pixels = magnitude.iter().filter(|&&m| m > threshold).count();
        let total_pixels = magnitude.len();
        let change_percentage = percentage(changed_pixels, total_pixels);

        debug!(
            "Pixel change: mean {:.4}, std {:.4}, threshold {:.4}, {}/{} changed",
            mean_magnitude, std_magnitude, threshold, changed_pixels, total_pixels
        );

        Ok(PixelChangeResult {
            change_percentage,
            threshold,
            mean_magnitude,
            std_magnitude,
            changed_pixels,
            total_pixels,
            magnitude,
        })
    }
}

impl Default for PixelChangeDetector {
    fn default() -> Self {
        Self {
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, s};

    use super::*;
    use crate::raster::{BandLayout, ElementType};

    fn pixel_major(data: Array3<f64>) -> RasterImage {
        RasterImage::new(data, BandLayout::PixelMajor, ElementType::U8).unwrap()
    }

    fn band_major(data: Array3<f64>) -> RasterImage {
        RasterImage::new(data, BandLayout::BandMajor, ElementType::U16).unwrap()
    }

    #[test]
    fn test_identical_inputs_report_no_change() {
        let image = pixel_major(Array3::from_elem((20, 20, 3), 77.0));
        let result = PixelChangeDetector::default().detect(&image, &image.clone()).unwrap();

        assert_eq!(result.change_percentage, 0.0);
        assert_eq!(result.threshold, 0.0);
        assert_eq!(result.std_magnitude, 0.0);
    }

    #[test]
    fn test_uniform_step_has_zero_variance() {
        let before = pixel_major(Array3::zeros((50, 50, 3)));
        let after = pixel_major(Array3::from_elem((50, 50, 3), 255.0));
        let result = PixelChangeDetector::default().detect(&before, &after).unwrap();

        assert_eq!(result.mean_magnitude, 255.0);
        assert_eq!(result.std_magnitude, 0.0);
        assert_eq!(result.threshold, 255.0);
        assert_eq!(result.change_percentage, 0.0);
    }

    #[test]
    fn test_block_change_in_band_major_raster() {
        let before = Array3::from_elem((4, 100, 100), 1000.0);
        let mut after = before.clone();
        after.slice_mut(s![3, 0..10, 0..10]).mapv_inplace(|v| v + 8000.0);

        let result = PixelChangeDetector::default()
            .detect(&band_major(before), &band_major(after))
            .unwrap();

        assert_eq!(result.changed_pixels, 100);
        assert!((result.change_percentage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_higher_factor_never_flags_more() {
        let before = Array3::<f64>::zeros((32, 32, 3));
        let after = Array3::from_shape_fn((32, 32, 3), |(y, x, b)| ((y * 7 + x * 13 + b * 3) % 50) as f64);
        let (before, after) = (pixel_major(before), pixel_major(after));

        let mut previous = f64::INFINITY;
        for k in [-1.0, 0.0, 0.5, 1.0, 2.0, 3.0] {
            let pct = PixelChangeDetector::new(k)
                .unwrap()
                .detect(&before, &after)
                .unwrap()
                .change_percentage;
            assert!(pct <= previous);
            previous = pct;
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let before = pixel_major(Array3::from_shape_fn((16, 24, 3), |(y, x, b)| (y + x + b) as f64));
        let after = pixel_major(Array3::from_shape_fn((16, 24, 3), |(y, x, b)| (y * x + b) as f64));

        let par = PixelChangeDetector::new(1.0).unwrap().detect(&before, &after).unwrap();
        let seq = PixelChangeDetector::new(1.0)
            .unwrap()
            .with_parallel(false)
            .detect(&before, &after)
            .unwrap();

        assert_eq!(par.magnitude, seq.magnitude);
        assert_eq!(par.change_percentage, seq.change_percentage);
    }

    #[test]
    fn test_shape_mismatch() {
        let before = pixel_major(Array3::zeros((10, 10, 3)));
        let after = pixel_major(Array3::zeros((10, 12, 3)));
        let err = PixelChangeDetector::default().detect(&before, &after).unwrap_err();
        assert!(matches!(err, ChangeError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_non_finite_factor_rejected() {
        assert!(PixelChangeDetector::new(f64::NAN).is_err());
        assert!(PixelChangeDetector::new(f64::INFINITY).is_err());
    }
}
