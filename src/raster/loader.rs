use std::{fs::File, io::BufReader, path::Path};

use log::{debug, info, warn};
use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult, Limits};

use crate::{
    error::{ChangeError, Result},
    raster::{BandLayout, ElementType, RasterImage},
};

/// Which decoder produced a loaded pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPathway {
    Multiband,
    Rgb,
}

pub struct RasterLoader {
    parallel: bool,
}

impl RasterLoader {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Loads both images through the same pathway: multi-band TIFF first,
    /// then 3-channel RGB for both if either TIFF read fails.
    pub fn load_pair<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        before: P,
        after: Q,
    ) -> Result<(RasterImage, RasterImage, LoadPathway)> {
        let (before, after) = (before.as_ref(), after.as_ref());

        let (before_multi, after_multi) = self.both(|| Self::load_multiband(before), || Self::load_multiband(after));

        match (before_multi, after_multi) {
            (Ok(b), Ok(a)) => {
                info!(
                    "Loaded multi-band rasters ({} bands, {}x{})",
                    b.band_count(),
                    b.width(),
                    b.height()
                );
                return Ok((b, a, LoadPathway::Multiband));
            }
            (b, a) => {
                for err in [b.err(), a.err()].into_iter().flatten() {
                    debug!("Multi-band read failed: {}", err);
                }
                warn!("Falling back to RGB image loading for both inputs");
            }
        }

        let (b, a) = self.both(|| Self::load_rgb(before), || Self::load_rgb(after));
        let (b, a) = (b?, a?);
        info!("Loaded RGB images ({}x{})", b.width(), b.height());

        Ok((b, a, LoadPathway::Rgb))
    }

    fn both<A, B>(&self, a: A, b: B) -> (Result<RasterImage>, Result<RasterImage>)
    where
        A: FnOnce() -> Result<RasterImage> + Send,
        B: FnOnce() -> Result<RasterImage> + Send,
    {
        if self.parallel {
            rayon::join(a, b)
        } else {
            (a(), b())
        }
    }

    /// Reads every sample of a TIFF into a band-major raster.
    pub fn load_multiband<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| format_read(path, e))?;

        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| format_read(path, e))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions().map_err(|e| format_read(path, e))?;
        let decoded = decoder.read_image().map_err(|e| format_read(path, e))?;
        let (samples, element_type) = widen(decoded).ok_or_else(|| {
            ChangeError::UnsupportedLayout(format!("unsupported sample format in {}", path.display()))
        })?;

        let pixels = width as usize * height as usize;
        if pixels == 0 || samples.len() % pixels != 0 {
            return Err(ChangeError::UnsupportedLayout(format!(
                "{} samples do not tile a {}x{} raster",
                samples.len(),
                width,
                height
            )));
        }
        let bands = samples.len() / pixels;

        let interleaved = Array3::from_shape_vec((height as usize, width as usize, bands), samples)?;
        let band_major = interleaved.permuted_axes([2, 0, 1]).as_standard_layout().into_owned();

        debug!("{}: {} band(s) of {:?}", path.display(), bands, element_type);

        RasterImage::new(band_major, BandLayout::BandMajor, element_type)
    }

    /// Reads any format the `image` crate knows, forced to 3-channel RGB.
    pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
        let path = path.as_ref();
        let rgb = image::open(path).map_err(|e| format_read(path, e))?.to_rgb8();
        let (width, height) = rgb.dimensions();

        let samples = rgb.into_raw().into_iter().map(f64::from).collect();
        let data = Array3::from_shape_vec((height as usize, width as usize, 3), samples)?;

        RasterImage::new(data, BandLayout::PixelMajor, ElementType::U8)
    }
}

impl Default for RasterLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn format_read(path: &Path, err: impl std::fmt::Display) -> ChangeError {
    ChangeError::FormatRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[allow(unreachable_patterns)]
fn widen(decoded: DecodingResult) -> Option<(Vec<f64>, ElementType)> {
    let widened = match decoded {
        DecodingResult::U8(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::U8),
        DecodingResult::U16(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::U16),
        DecodingResult::U32(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::U32),
        DecodingResult::U64(buf) => (buf.into_iter().map(|v| v as f64).collect(), ElementType::U64),
        DecodingResult::I8(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::I8),
        DecodingResult::I16(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::I16),
        DecodingResult::I32(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::I32),
        DecodingResult::I64(buf) => (buf.into_iter().map(|v| v as f64).collect(), ElementType::I64),
        DecodingResult::F32(buf) => (buf.into_iter().map(f64::from).collect(), ElementType::F32),
        DecodingResult::F64(buf) => (buf, ElementType::F64),
        _ => return None,
    };

    Some(widened)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_format_error() {
        let err = RasterLoader::load_multiband("/nonexistent/before.tif").unwrap_err();
        assert!(matches!(err, ChangeError::FormatRead { .. }));

        let err = RasterLoader::load_rgb("/nonexistent/before.png").unwrap_err();
        assert!(matches!(err, ChangeError::FormatRead { .. }));
    }

    #[test]
    fn test_widen_keeps_element_type() {
        let (samples, element_type) = widen(DecodingResult::U16(vec![0, 65535])).unwrap();
        assert_eq!(samples, vec![0.0, 65535.0]);
        assert_eq!(element_type, ElementType::U16);
    }
}
