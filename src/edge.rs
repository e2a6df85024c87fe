//! Sobel gradient magnitude over a luminance plane.

use ndarray::{Array2, ArrayView2};

/// Gradient magnitude `sqrt(gx² + gy²)` per pixel.
///
/// Borders are handled by replicating the outermost row/column, so the
/// output has the same shape as the input.
pub fn sobel_magnitude(luma: ArrayView2<f32>) -> Array2<f32> {
    let (h, w) = luma.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    if h == 0 || w == 0 {
        return out;
    }

    // Edge-replicated fetch
    let at = |y: isize, x: isize| -> f32 {
        let yy = y.clamp(0, h as isize - 1) as usize;
        let xx = x.clamp(0, w as isize - 1) as usize;
        luma[[yy, xx]]
    };

    for y in 0..h as isize {
        for x in 0..w as isize {
            // [ 1 0 -1]      [ 1  2  1]
            // [ 2 0 -2]      [ 0  0  0]
            // [ 1 0 -1]      [-1 -2 -1]
            let gx = at(y - 1, x - 1) + 2.0 * at(y, x - 1) + at(y + 1, x - 1)
                - at(y - 1, x + 1)
                - 2.0 * at(y, x + 1)
                - at(y + 1, x + 1);
            let gy = at(y - 1, x - 1) + 2.0 * at(y - 1, x) + at(y - 1, x + 1)
                - at(y + 1, x - 1)
                - 2.0 * at(y + 1, x)
                - at(y + 1, x + 1);
            out[[y as usize, x as usize]] = (gx * gx + gy * gy).sqrt();
        }
    }

    out
}
