use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("Failed to read raster {}: {reason}", .path.display())]
    FormatRead { path: PathBuf, reason: String },

    #[error("Shape mismatch: before is {before:?}, after is {after:?}")]
    ShapeMismatch { before: Vec<usize>, after: Vec<usize> },

    #[error("Unsupported band layout: {0}")]
    UnsupportedLayout(String),

    #[error("Change map rendering failed: {0}")]
    Render(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ChangeError {
    pub fn shape_mismatch(before: &[usize], after: &[usize]) -> Self {
        ChangeError::ShapeMismatch {
            before: before.to_vec(),
            after: after.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChangeError>;
