pub mod loader;

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ChangeError, Result};

/// Axis arrangement of a raster's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandLayout {
    /// `(bands, height, width)`, as scientific raster formats store it.
    BandMajor,
    /// `(height, width, bands)`, as consumer image formats store it.
    PixelMajor,
}

/// Numeric type the samples were decoded from before being widened to `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

/// A stack of equally sized bands plus the layout they are stored in.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    data: Array3<f64>,
    layout: BandLayout,
    element_type: ElementType,
}

impl RasterImage {
    pub fn new(data: Array3<f64>, layout: BandLayout, element_type: ElementType) -> Result<Self> {
        let raster = Self {
            data,
            layout,
            element_type,
        };

        if raster.band_count() == 0 || raster.width() == 0 || raster.height() == 0 {
            return Err(ChangeError::UnsupportedLayout(format!(
                "empty raster of shape {:?}",
                raster.data.shape()
            )));
        }

        Ok(raster)
    }

    pub fn layout(&self) -> BandLayout {
        self.layout
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn band_count(&self) -> usize {
        match self.layout {
            BandLayout::BandMajor => self.data.len_of(Axis(0)),
            BandLayout::PixelMajor => self.data.len_of(Axis(2)),
        }
    }

    pub fn height(&self) -> usize {
        match self.layout {
            BandLayout::BandMajor => self.data.len_of(Axis(1)),
            BandLayout::PixelMajor => self.data.len_of(Axis(0)),
        }
    }

    pub fn width(&self) -> usize {
        match self.layout {
            BandLayout::BandMajor => self.data.len_of(Axis(2)),
            BandLayout::PixelMajor => self.data.len_of(Axis(1)),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// `[bands, height, width]`, independent of the storage layout.
    pub fn shape(&self) -> [usize; 3] {
        [self.band_count(), self.height(), self.width()]
    }

    pub fn same_shape(&self, other: &RasterImage) -> bool {
        self.shape() == other.shape()
    }

    pub fn ensure_same_shape(&self, other: &RasterImage) -> Result<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(ChangeError::shape_mismatch(&self.shape(), &other.shape()))
        }
    }

    /// A `(height, width)` view of one band.
    ///
    /// # Panics
    /// When `index >= band_count()`.
    pub fn band(&self, index: usize) -> ArrayView2<'_, f64> {
        match self.layout {
            BandLayout::BandMajor => self.data.index_axis(Axis(0), index),
            BandLayout::PixelMajor => self.data.index_axis(Axis(2), index),
        }
    }

    /// Samples as `(height, width, bands)` without copying.
    pub fn to_pixel_major(&self) -> ArrayView3<'_, f64> {
        match self.layout {
            BandLayout::BandMajor => self.data.view().permuted_axes([1, 2, 0]),
            BandLayout::PixelMajor => self.data.view(),
        }
    }

    /// Band indices holding red, green and blue. Band-major rasters start
    /// with blue, consumer images with red.
    pub fn rgb_bands(&self) -> Option<[usize; 3]> {
        if self.band_count() < 3 {
            return None;
        }

        Some(match self.layout {
            BandLayout::BandMajor => [2, 1, 0],
            BandLayout::PixelMajor => [0, 1, 2],
        })
    }
}

/// Zero-based positions of the bands the spectral indices read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandOrder {
    pub red: usize,
    pub nir: usize,
    pub swir: Option<usize>,
}

impl Default for BandOrder {
    /// Blue, green, red, near-infrared, short-wave infrared.
    fn default() -> Self {
        Self {
            red: 2,
            nir: 3,
            swir: Some(4),
        }
    }
}

impl BandOrder {
    pub fn validate(&self, band_count: usize) -> Result<()> {
        if self.red >= band_count || self.nir >= band_count {
            return Err(ChangeError::InvalidParameter(format!(
                "red band {} / nir band {} out of range for {} bands",
                self.red, self.nir, band_count
            )));
        }

        if self.red == self.nir || self.swir.is_some_and(|s| s == self.red || s == self.nir) {
            return Err(ChangeError::InvalidParameter(
                "red, nir and swir must be distinct bands".into(),
            ));
        }

        Ok(())
    }

    /// The SWIR band, if configured and actually present.
    pub fn swir_in(&self, band_count: usize) -> Option<usize> {
        self.swir.filter(|&s| s < band_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_major_dimensions() {
        let data = Array3::<f64>::zeros((4, 10, 20));
        let raster = RasterImage::new(data, BandLayout::BandMajor, ElementType::U16).unwrap();

        assert_eq!(raster.band_count(), 4);
        assert_eq!(raster.height(), 10);
        assert_eq!(raster.width(), 20);
        assert_eq!(raster.to_pixel_major().dim(), (10, 20, 4));
    }

    #[test]
    fn test_band_views_agree_across_layouts() {
        let band_major = Array3::from_shape_fn((3, 2, 2), |(b, y, x)| (b * 100 + y * 10 + x) as f64);
        let pixel_major = band_major.view().permuted_axes([1, 2, 0]).to_owned();

        let a = RasterImage::new(band_major, BandLayout::BandMajor, ElementType::F64).unwrap();
        let b = RasterImage::new(pixel_major, BandLayout::PixelMajor, ElementType::F64).unwrap();

        assert!(a.same_shape(&b));
        for i in 0..3 {
            assert_eq!(a.band(i), b.band(i));
        }
    }

    #[test]
    fn test_empty_raster_rejected() {
        let data = Array3::<f64>::zeros((0, 10, 10));
        let err = RasterImage::new(data, BandLayout::BandMajor, ElementType::U8).unwrap_err();
        assert!(matches!(err, ChangeError::UnsupportedLayout(_)));
    }

    #[test]
    fn test_rgb_bands_follow_layout() {
        let satellite = RasterImage::new(Array3::zeros((3, 4, 4)), BandLayout::BandMajor, ElementType::U16).unwrap();
        let photo = RasterImage::new(Array3::zeros((4, 4, 3)), BandLayout::PixelMajor, ElementType::U8).unwrap();

        let pair = RasterImage::new(Array3::zeros((2, 4, 4)), BandLayout::BandMajor, ElementType::U16).unwrap();

        assert_eq!(satellite.rgb_bands(), Some([2, 1, 0]));
        assert_eq!(photo.rgb_bands(), Some([0, 1, 2]));
        assert_eq!(pair.rgb_bands(), None);
        // red stays where the index calculator reads it
        assert_eq!(satellite.rgb_bands().map(|[red, _, _]| red), Some(BandOrder::default().red));
    }

    #[test]
    fn test_band_order_validation() {
        let order = BandOrder::default();
        assert!(order.validate(4).is_ok());
        assert!(order.validate(3).is_err());
        assert_eq!(order.swir_in(4), None);
        assert_eq!(order.swir_in(5), Some(4));

        let clashing = BandOrder { red: 1, nir: 1, swir: None };
        assert!(clashing.validate(4).is_err());
    }
}
