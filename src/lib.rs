use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{
        index_change::{IndexChangeAnalyzer, IndexChangeResult},
        pixel_change::{DEFAULT_THRESHOLD_FACTOR, PixelChangeDetector},
        rgb_change::RgbChangeAnalyzer,
    },
    error::Result,
    raster::{BandOrder, RasterImage, loader::RasterLoader},
    report::{
        PrimaryAnalysis,
        visualization::{VisualizationConfig, Visualizer},
    },
};

pub mod analysis;
pub mod error;
pub mod image_utils;
pub mod raster;
pub mod report;

pub use error::ChangeError;
pub use report::{AnalysisType, ChangeReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// `k` in the pixel threshold `mean + k * std`; lower is more sensitive.
    pub threshold_factor: f64,
    pub band_order: BandOrder,
    /// Where to write the change map, if anywhere.
    pub change_map: Option<PathBuf>,
    pub parallel: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            band_order: BandOrder::default(),
            change_map: None,
            parallel: true,
        }
    }
}

impl DetectionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ChangeError::InvalidParameter(format!("invalid detection config: {}", e)))
    }
}

/// Compares a before/after image pair and reports how much changed.
pub struct ChangeDetector {
    config: DetectionConfig,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detect<P: AsRef<Path>, Q: AsRef<Path>>(&self, before: P, after: Q) -> Result<ChangeReport> {
        let loader = RasterLoader::new().with_parallel(self.config.parallel);
        let (before, after, pathway) = loader.load_pair(before, after)?;
        info!("Comparing {:?} pair", pathway);

        self.analyze(&before, &after)
    }

    /// Runs every analysis on rasters already in memory.
    pub fn analyze(&self, before: &RasterImage, after: &RasterImage) -> Result<ChangeReport> {
        before.ensure_same_shape(after)?;

        let pixel = PixelChangeDetector::new(self.config.threshold_factor)?
            .with_parallel(self.config.parallel)
            .detect(before, after)?;

        let primary = self.primary_analysis(before, after)?;
        let mut report = ChangeReport::reconcile(primary, &pixel);

        if let Some(ref path) = self.config.change_map {
            let visualizer = Visualizer::with_config(VisualizationConfig {
                parallel: self.config.parallel,
                ..VisualizationConfig::default()
            });

            match visualizer.render_change_map(before, after, path) {
                Ok(written) => report.change_map_path = Some(written),
                Err(e) => {
                    warn!("Change map skipped: {}", e);
                    report.caveats.push(e.to_string());
                }
            }
        }

        info!(
            "{:?}: total change {:.2}%, pixel change {:.2}%",
            report.analysis_type, report.total_change_percentage, report.pixel_change_percentage
        );

        Ok(report)
    }

    fn primary_analysis(&self, before: &RasterImage, after: &RasterImage) -> Result<PrimaryAnalysis> {
        if IndexChangeAnalyzer::applies_to(before) {
            let analyzer = IndexChangeAnalyzer::new(self.config.band_order);
            return Ok(PrimaryAnalysis::Indices(analyzer.analyze(before, after)?));
        }

        if RgbChangeAnalyzer::applies_to(before) {
            return Ok(PrimaryAnalysis::Rgb(RgbChangeAnalyzer::new().analyze(before, after)?));
        }

        info!(
            "{} band(s) carry no spectral indices, reporting pixel change only",
            before.band_count()
        );
        Ok(PrimaryAnalysis::Indices(IndexChangeResult::default()))
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads both files, analyzes them and optionally writes a change map.
pub fn detect_changes<P: AsRef<Path>, Q: AsRef<Path>>(
    before: P,
    after: Q,
    threshold_factor: f64,
    change_map: Option<&Path>,
) -> Result<ChangeReport> {
    let config = DetectionConfig {
        threshold_factor,
        change_map: change_map.map(Path::to_path_buf),
        ..DetectionConfig::default()
    };

    ChangeDetector::new().with_config(config).detect(before, after)
}
