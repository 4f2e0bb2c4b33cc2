use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::indices::{built_up_index, vegetation_index},
    error::{ChangeError, Result},
    image_utils::percentage,
    raster::{BandLayout, BandOrder, RasterImage},
};

/// Minimum index shift counted as a significant change.
pub const SIGNIFICANT_INDEX_SHIFT: f64 = 0.1;

/// Fewest bands that carry both red and near-infrared.
pub const MIN_INDEX_BANDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationChanges {
    pub loss_percentage: f64,
    pub gain_percentage: f64,
    pub net_change: f64,
    pub mean_ndvi_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanChanges {
    pub growth_percentage: f64,
    pub decline_percentage: f64,
    pub net_change: f64,
    pub mean_ndbi_change: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexChangeResult {
    pub vegetation: Option<VegetationChanges>,
    pub urban: Option<UrbanChanges>,
    pub total_change_percentage: f64,
}

/// Share of pixels whose index dropped, rose, and the mean shift.
struct IndexShift {
    decrease_percentage: f64,
    increase_percentage: f64,
    mean_delta: f64,
}

impl IndexShift {
    fn between(before: &Array2<f64>, after: &Array2<f64>) -> Self {
        let delta = after - before;
        let total = delta.len();

        let decreased = delta.iter().filter(|&&d| d < -SIGNIFICANT_INDEX_SHIFT).count();
        let increased = delta.iter().filter(|&&d| d > SIGNIFICANT_INDEX_SHIFT).count();

        Self {
            decrease_percentage: percentage(decreased, total),
            increase_percentage: percentage(increased, total),
            mean_delta: delta.mean().unwrap_or(0.0),
        }
    }
}

pub struct IndexChangeAnalyzer {
    band_order: BandOrder,
}

impl IndexChangeAnalyzer {
    pub fn new(band_order: BandOrder) -> Self {
        Self { band_order }
    }

    /// Whether `raster` carries the bands this analyzer needs.
    pub fn applies_to(raster: &RasterImage) -> bool {
        raster.layout() == BandLayout::BandMajor && raster.band_count() >= MIN_INDEX_BANDS
    }

    pub fn analyze(&self, before: &RasterImage, after: &RasterImage) -> Result<IndexChangeResult> {
        before.ensure_same_shape(after)?;

        if before.layout() != BandLayout::BandMajor {
            return Err(ChangeError::UnsupportedLayout(
                "spectral indices need a band-major raster".into(),
            ));
        }

        let bands = before.band_count();
        if bands < MIN_INDEX_BANDS {
            return Err(ChangeError::UnsupportedLayout(format!(
                "spectral indices need at least {} bands, got {}",
                MIN_INDEX_BANDS, bands
            )));
        }
        self.band_order.validate(bands)?;

        let BandOrder { red, nir, .. } = self.band_order;

        let ndvi_before = vegetation_index(before.band(nir), before.band(red))?;
        let ndvi_after = vegetation_index(after.band(nir), after.band(red))?;
        let ndvi = IndexShift::between(&ndvi_before, &ndvi_after);

        let vegetation = VegetationChanges {
            loss_percentage: ndvi.decrease_percentage,
            gain_percentage: ndvi.increase_percentage,
            net_change: ndvi.increase_percentage - ndvi.decrease_percentage,
            mean_ndvi_change: ndvi.mean_delta,
        };

        let urban = match self.band_order.swir_in(bands) {
            Some(swir) => {
                let ndbi_before = built_up_index(before.band(swir), before.band(nir))?;
                let ndbi_after = built_up_index(after.band(swir), after.band(nir))?;
                let ndbi = IndexShift::between(&ndbi_before, &ndbi_after);

                Some(UrbanChanges {
                    growth_percentage: ndbi.increase_percentage,
                    decline_percentage: ndbi.decrease_percentage,
                    net_change: ndbi.increase_percentage - ndbi.decrease_percentage,
                    mean_ndbi_change: ndbi.mean_delta,
                })
            }
            None => None,
        };

        let mut total_change_percentage = vegetation.loss_percentage + vegetation.gain_percentage;
        if let Some(ref urban) = urban {
            total_change_percentage += urban.growth_percentage + urban.decline_percentage;
        }

        debug!(
            "Index change: vegetation {:.2}%/{:.2}%, urban {}, aggregate {:.2}%",
            vegetation.loss_percentage,
            vegetation.gain_percentage,
            if urban.is_some() { "present" } else { "absent" },
            total_change_percentage
        );

        Ok(IndexChangeResult {
            vegetation: Some(vegetation),
            urban,
            total_change_percentage,
        })
    }
}

impl Default for IndexChangeAnalyzer {
    fn default() -> Self {
        Self::new(BandOrder::default())
    }
}
