use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::{ChangeError, Result};

/// Range padding used when stretching an array whose values are all equal.
pub const STRETCH_EPSILON: f64 = 1e-8;

/// Per-pixel mean over bands of `|after - before|` for two `(height, width, bands)` views.
pub fn mean_abs_difference(
    before: ArrayView3<f64>,
    after: ArrayView3<f64>,
    parallel: bool,
) -> Result<Array2<f64>> {
    if before.shape() != after.shape() {
        return Err(ChangeError::shape_mismatch(before.shape(), after.shape()));
    }

    let (height, width, bands) = before.dim();
    let mut magnitude = Array2::<f64>::zeros((height, width));

    let zip = Zip::from(&mut magnitude)
        .and(before.lanes(Axis(2)))
        .and(after.lanes(Axis(2)));

    if parallel {
        zip.par_for_each(|out, b, a| *out = lane_mean_abs(b, a, bands));
    } else {
        zip.for_each(|out, b, a| *out = lane_mean_abs(b, a, bands));
    }

    Ok(magnitude)
}

fn lane_mean_abs(before: ArrayView1<f64>, after: ArrayView1<f64>, bands: usize) -> f64 {
    let sum = after
        .iter()
        .zip(before.iter())
        .map(|(a, b)| (a - b).abs())
        .sum::<f64>();
    sum / bands as f64
}

pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// Linearly maps the observed minimum to 0 and the maximum to 255.
pub fn normalize_to_u8(arr: ArrayView2<f64>) -> Result<Array2<f64>> {
    let min = arr.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = arr.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return Err(ChangeError::Render(format!(
            "cannot stretch array of shape {:?} with range [{}, {}]",
            arr.shape(),
            min,
            max
        )));
    }

    let range = max - min + STRETCH_EPSILON;

    Ok(arr.mapv(|v| 255.0 * (v - min) / range))
}

pub fn array_to_gray(arr: &Array2<f64>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut image = GrayImage::new(width as u32, height as u32);

    for ((y, x), value) in arr.indexed_iter() {
        image.put_pixel(x as u32, y as u32, Luma([value.clamp(0.0, 255.0) as u8]));
    }

    image
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, array};

    use super::*;

    #[test]
    fn test_mean_abs_difference_averages_bands() {
        let before = Array3::<f64>::zeros((2, 2, 3));
        let mut after = Array3::<f64>::zeros((2, 2, 3));
        after[[0, 0, 0]] = 30.0;
        after[[1, 1, 2]] = -6.0;

        for parallel in [false, true] {
            let mag = mean_abs_difference(before.view(), after.view(), parallel).unwrap();
            assert_eq!(mag, array![[10.0, 0.0], [0.0, 2.0]]);
        }
    }

    #[test]
    fn test_mean_abs_difference_shape_mismatch() {
        let before = Array3::<f64>::zeros((2, 2, 3));
        let after = Array3::<f64>::zeros((2, 3, 3));
        let err = mean_abs_difference(before.view(), after.view(), false).unwrap_err();
        assert!(matches!(err, ChangeError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_normalize_constant_array() {
        let arr = Array2::from_elem((3, 3), 42.0);
        let norm = normalize_to_u8(arr.view()).unwrap();
        assert!(norm.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_spans_full_range() {
        let arr = array![[1.0, 2.0], [3.0, 5.0]];
        let norm = normalize_to_u8(arr.view()).unwrap();
        assert_eq!(norm[[0, 0]], 0.0);
        assert!((norm[[1, 1]] - 255.0).abs() < 1e-6);
        assert_eq!(array_to_gray(&norm).get_pixel(1, 1)[0], 254);
    }
}
