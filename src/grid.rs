//! Grid sizing and crop normalization.
//!
//! Nothing here rejects a request: out-of-range values are clamped and a
//! human-readable warning is recorded for each adjustment.

use crate::settings::Crop;
use tracing::warn;

/// Hard ceiling on either grid axis.
pub const MAX_GRID_DIM: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridResult {
    pub grid_w: u32,
    pub grid_h: u32,
    pub warnings: Vec<String>,
}

fn clamp_dim(value: i64, max_dim: u32, warnings: &mut Vec<String>) -> u32 {
    if value > max_dim as i64 {
        warnings.push(format!("Requested grid dimension {value} clamped to {max_dim}."));
        max_dim
    } else if value < 1 {
        warnings.push(format!("Requested grid dimension {value} raised to 1."));
        1
    } else {
        value as u32
    }
}

/// `other * ratio`, rounded half-to-even, at least 1.
fn proportional(other: u32, num: u32, den: u32) -> u32 {
    let v = (num as f64 / den.max(1) as f64 * other as f64).round_ties_even();
    v.max(1.0) as u32
}

/// Decide grid dimensions for a `width × height` crop.
///
/// With no explicit dimensions the longer crop axis maps to `max_dim` and
/// the other follows the aspect ratio. Explicit values are clamped into
/// `[1, max_dim]` and a missing one is derived from the aspect ratio.
/// `lock_aspect` is carried for callers but two explicit values are always
/// honored as given (after clamping).
pub fn compute_grid_size(
    width: u32,
    height: u32,
    max_dim: u32,
    grid_w: Option<i64>,
    grid_h: Option<i64>,
    _lock_aspect: bool,
) -> GridResult {
    let mut warnings = Vec::new();
    let max_dim = max_dim.clamp(1, MAX_GRID_DIM);
    let (width, height) = (width.max(1), height.max(1));

    let (mut gw, mut gh) = match (grid_w, grid_h) {
        (None, None) if width >= height => (max_dim, proportional(max_dim, height, width)),
        (None, None) => (proportional(max_dim, width, height), max_dim),
        (Some(w), None) => {
            let w = clamp_dim(w, max_dim, &mut warnings);
            (w, proportional(w, height, width))
        }
        (None, Some(h)) => {
            let h = clamp_dim(h, max_dim, &mut warnings);
            (proportional(h, width, height), h)
        }
        (Some(w), Some(h)) => {
            let w = clamp_dim(w, max_dim, &mut warnings);
            let h = clamp_dim(h, max_dim, &mut warnings);
            (w, h)
        }
    };

    // Derived axes can overshoot on extreme aspect ratios
    if gw > max_dim {
        gw = max_dim;
        warnings.push("Grid width clamped to max_dim.".to_string());
    }
    if gh > max_dim {
        gh = max_dim;
        warnings.push("Grid height clamped to max_dim.".to_string());
    }

    for w in &warnings {
        warn!("{}", w);
    }

    GridResult { grid_w: gw, grid_h: gh, warnings }
}

/// Clamp `crop` into a `width × height` image, returning `(x, y, w, h)`.
///
/// A crop with non-positive width or height selects the whole image.
pub fn normalize_crop(
    crop: &Crop,
    width: u32,
    height: u32,
    warnings: &mut Vec<String>,
) -> (u32, u32, u32, u32) {
    if crop.w <= 0 || crop.h <= 0 {
        return (0, 0, width, height);
    }

    let (iw, ih) = (width as i64, height as i64);
    let x = crop.x.clamp(0, (iw - 1).max(0));
    let y = crop.y.clamp(0, (ih - 1).max(0));
    let w = crop.w.min(iw - x).max(1);
    let h = crop.h.min(ih - y).max(1);

    if (x, y, w, h) != (crop.x, crop.y, crop.w, crop.h) {
        let msg = "Crop rectangle adjusted to fit within image bounds.".to_string();
        warn!("{}", msg);
        warnings.push(msg);
    }

    (x as u32, y as u32, w as u32, h as u32)
}
