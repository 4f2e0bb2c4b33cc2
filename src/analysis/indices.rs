//! Normalized-difference spectral indices.

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{ChangeError, Result};

/// Floor applied to index denominators.
pub const INDEX_EPSILON: f64 = 1e-10;

/// NDVI: `(ir - red) / max(ir + red, ε)`.
pub fn vegetation_index(infrared: ArrayView2<f64>, red: ArrayView2<f64>) -> Result<Array2<f64>> {
    normalized_difference(infrared, red)
}

/// NDBI: `(sw - ir) / max(sw + ir, ε)`.
pub fn built_up_index(shortwave: ArrayView2<f64>, infrared: ArrayView2<f64>) -> Result<Array2<f64>> {
    normalized_difference(shortwave, infrared)
}

fn normalized_difference(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
    if a.shape() != b.shape() {
        return Err(ChangeError::shape_mismatch(a.shape(), b.shape()));
    }

    Ok(Zip::from(&a)
        .and(&b)
        .map_collect(|&a, &b| (a - b) / (a + b).max(INDEX_EPSILON)))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_vegetation_index_values() {
        let nir = array![[0.8, 50.0], [10.0, 0.0]];
        let red = array![[0.2, 50.0], [0.0, 10.0]];
        let ndvi = vegetation_index(nir.view(), red.view()).unwrap();

        assert!((ndvi[[0, 0]] - 0.6).abs() < 1e-12);
        assert_eq!(ndvi[[0, 1]], 0.0);
        assert_eq!(ndvi[[1, 0]], 1.0);
        assert_eq!(ndvi[[1, 1]], -1.0);
    }

    #[test]
    fn test_zero_denominator_stays_finite() {
        let zeros = Array2::<f64>::zeros((8, 8));
        let ndvi = vegetation_index(zeros.view(), zeros.view()).unwrap();
        let ndbi = built_up_index(zeros.view(), zeros.view()).unwrap();

        assert!(ndvi.iter().chain(ndbi.iter()).all(|v| *v == 0.0));
    }

    #[test]
    fn test_built_up_index_sign() {
        let swir = array![[300.0]];
        let nir = array![[100.0]];
        let ndbi = built_up_index(swir.view(), nir.view()).unwrap();
        assert!((ndbi[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_integer_range_inputs_do_not_wrap() {
        let nir = Array2::from_elem((2, 2), 65535.0);
        let red = Array2::from_elem((2, 2), 65535.0);
        let ndvi = vegetation_index(nir.view(), red.view()).unwrap();
        assert!(ndvi.iter().all(|v| v.is_finite() && *v == 0.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((2, 3));
        let err = vegetation_index(a.view(), b.view()).unwrap_err();
        assert!(matches!(err, ChangeError::ShapeMismatch { .. }));
    }
}
