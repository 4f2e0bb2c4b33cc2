use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ChangeError, Result},
    image_utils::percentage,
    raster::RasterImage,
};

/// Per-sample difference counted towards the headline percentage.
pub const HEADLINE_THRESHOLD: f64 = 10.0;
/// Per-sample difference counted towards the channel breakdown.
pub const CHANNEL_THRESHOLD: f64 = 20.0;
/// Least sensitive of the reported thresholds.
pub const COARSE_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Vegetation,
    Urban,
    Unknown,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Vegetation => "vegetation",
            ChangeType::Urban => "urban",
            ChangeType::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelChanges {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelChanges {
    /// Green-dominant change reads as vegetation, red-dominant as urban.
    pub fn classify(&self) -> ChangeType {
        if self.green > self.red && self.green > self.blue {
            ChangeType::Vegetation
        } else if self.red > self.green && self.red > self.blue {
            ChangeType::Urban
        } else {
            ChangeType::Unknown
        }
    }
}

/// Changed-sample counts at each threshold, divided by the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreakdown {
    pub above_10: f64,
    pub above_20: f64,
    pub above_30: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RgbChangeResult {
    pub change_percentage: f64,
    pub channel_changes: ChannelChanges,
    pub change_type: ChangeType,
    pub total_pixels: usize,
    pub significant_changes: usize,
    pub breakdown: ThresholdBreakdown,
}

/// Coarse change statistics for three-channel imagery with no spectral bands.
pub struct RgbChangeAnalyzer;

impl RgbChangeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn applies_to(raster: &RasterImage) -> bool {
        raster.band_count() == 3
    }

    pub fn analyze(&self, before: &RasterImage, after: &RasterImage) -> Result<RgbChangeResult> {
        before.ensure_same_shape(after)?;

        let [red, green, blue] = before
            .rgb_bands()
            .filter(|_| Self::applies_to(before))
            .ok_or_else(|| {
                ChangeError::UnsupportedLayout(format!(
                    "RGB analysis needs 3 channels, got {}",
                    before.band_count()
                ))
            })?;

        let diff = (&after.to_pixel_major() - &before.to_pixel_major()).mapv(f64::abs);
        let total_pixels = before.pixel_count();

        let count_above = |t: f64| diff.iter().filter(|&&d| d > t).count();
        let breakdown = ThresholdBreakdown {
            above_10: count_above(HEADLINE_THRESHOLD) as f64 / 3.0,
            above_20: count_above(CHANNEL_THRESHOLD) as f64 / 3.0,
            above_30: count_above(COARSE_THRESHOLD) as f64 / 3.0,
        };

        let channel = |c: usize| {
            let changed = after
                .band(c)
                .iter()
                .zip(before.band(c).iter())
                .filter(|&(a, b)| (a - b).abs() > CHANNEL_THRESHOLD)
                .count();
            percentage(changed, total_pixels)
        };
        let channel_changes = ChannelChanges {
            red: channel(red),
            green: channel(green),
            blue: channel(blue),
        };
        let change_type = channel_changes.classify();

        let change_percentage = breakdown.above_10 / total_pixels as f64 * 100.0;

        debug!(
            "RGB change: {:.2}% at threshold {}, channels r={:.2} g={:.2} b={:.2} -> {}",
            change_percentage,
            HEADLINE_THRESHOLD,
            channel_changes.red,
            channel_changes.green,
            channel_changes.blue,
            change_type
        );

        Ok(RgbChangeResult {
            change_percentage,
            channel_changes,
            change_type,
            total_pixels,
            significant_changes: breakdown.above_10 as usize,
            breakdown,
        })
    }
}

impl Default for RgbChangeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
