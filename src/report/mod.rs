pub mod visualization;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    index_change::{IndexChangeResult, UrbanChanges, VegetationChanges},
    pixel_change::PixelChangeResult,
    rgb_change::{ChangeType, ChannelChanges, RgbChangeResult, ThresholdBreakdown},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    SatelliteIndices,
    RgbBased,
}

/// The analysis that produced the report's primary fields.
#[derive(Debug, Clone)]
pub enum PrimaryAnalysis {
    Indices(IndexChangeResult),
    Rgb(RgbChangeResult),
}

impl PrimaryAnalysis {
    pub fn total_change_percentage(&self) -> f64 {
        match self {
            PrimaryAnalysis::Indices(indices) => indices.total_change_percentage,
            PrimaryAnalysis::Rgb(rgb) => rgb.change_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub analysis_type: AnalysisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vegetation_changes: Option<VegetationChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urban_changes: Option<UrbanChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_changes: Option<ChannelChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pixels: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significant_changes: Option<usize>,
    /// Changed samples per pixel at thresholds 10, 20 and 30.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_breakdown: Option<ThresholdBreakdown>,
    pub pixel_change_percentage: f64,
    pub total_change_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_map_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

impl ChangeReport {
    /// Merges the primary analysis with the pixel-level result. The headline
    /// is whichever of the two percentages is larger.
    pub fn reconcile(primary: PrimaryAnalysis, pixel: &PixelChangeResult) -> Self {
        let total_change_percentage = primary
            .total_change_percentage()
            .max(pixel.change_percentage);

        let mut report = Self {
            analysis_type: AnalysisType::SatelliteIndices,
            vegetation_changes: None,
            urban_changes: None,
            channel_changes: None,
            change_type: None,
            total_pixels: None,
            significant_changes: None,
            threshold_breakdown: None,
            pixel_change_percentage: pixel.change_percentage,
            total_change_percentage,
            change_map_path: None,
            caveats: Vec::new(),
        };

        match primary {
            PrimaryAnalysis::Indices(indices) => {
                report.vegetation_changes = indices.vegetation;
                report.urban_changes = indices.urban;
            }
            PrimaryAnalysis::Rgb(rgb) => {
                report.analysis_type = AnalysisType::RgbBased;
                report.channel_changes = Some(rgb.channel_changes);
                report.change_type = Some(rgb.change_type);
                report.total_pixels = Some(rgb.total_pixels);
                report.significant_changes = Some(rgb.significant_changes);
                report.threshold_breakdown = Some(rgb.breakdown);
            }
        }

        report
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
