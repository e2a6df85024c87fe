//! Image chunking - splits an image into grid cells and summarizes each one
//! as an (L, a, b, edge, alpha-coverage) feature vector.

use crate::color;
use crate::edge::sobel_magnitude;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::{Array2, Array3};

/// Subsamples per cell per axis.
pub const DEFAULT_SAMPLE: u32 = 4;
/// Width of a feature vector.
pub const FEATURE_DIM: usize = 5;

// Subsample counts as covered above this opacity
const ALPHA_THRESHOLD: f32 = 0.1;

/// Per-cell features plus the per-channel grids they were built from.
#[derive(Debug, Clone)]
pub struct GridFeatures {
    /// `(grid_w * grid_h, 5)`, row-major over cells
    pub features: Array2<f32>,
    /// `(grid_h, grid_w, 3)`
    pub lab: Array3<f32>,
    /// `(grid_h, grid_w)`
    pub edge: Array2<f32>,
    /// `(grid_h, grid_w)`
    pub alpha: Array2<f32>,
}

/// Lab, edge and alpha planes of an RGBA bitmap.
struct Planes {
    width: usize,
    lab: Vec<[f32; 3]>,
    edge: Array2<f32>,
    alpha: Vec<f32>,
}

impl Planes {
    fn from_rgba(image: &RgbaImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let mut rgb = Vec::with_capacity(w * h);
        let mut alpha = Vec::with_capacity(w * h);
        for p in image.pixels() {
            let [r, g, b, a] = p.0;
            rgb.push([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
            alpha.push(a as f32 / 255.0);
        }

        let luma = Array2::from_shape_fn((h, w), |(y, x)| color::luma(rgb[y * w + x]));
        let edge = sobel_magnitude(luma.view());
        let lab = color::rgb_to_lab(&rgb);

        Self { width: w, lab, edge, alpha }
    }

    /// Mean feature over the pixel block `[x0, x1) × [y0, y1)`.
    fn block_mean(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> [f32; FEATURE_DIM] {
        let mut acc = [0.0f32; FEATURE_DIM];
        for y in y0..y1 {
            for x in x0..x1 {
                let i = y * self.width + x;
                let lab = self.lab[i];
                acc[0] += lab[0];
                acc[1] += lab[1];
                acc[2] += lab[2];
                acc[3] += self.edge[[y, x]];
                if self.alpha[i] > ALPHA_THRESHOLD {
                    acc[4] += 1.0;
                }
            }
        }
        let n = ((x1 - x0) * (y1 - y0)).max(1) as f32;
        acc.map(|v| v / n)
    }
}

pub struct ImageChunker {
    planes: Planes,
    cols: u32,
    rows: u32,
    sample: usize,
}

impl ImageChunker {
    /// Resample `image` to `cols*sample × rows*sample` and precompute its planes.
    pub fn new(image: &DynamicImage, cols: u32, rows: u32, sample: u32) -> Self {
        let (cols, rows, sample) = (cols.max(1), rows.max(1), sample.max(1));
        let resized = resize_premultiplied(image, cols * sample, rows * sample);
        Self { planes: Planes::from_rgba(&resized), cols, rows, sample: sample as usize }
    }

    /// Feature vector of the cell at (col, row)
    pub fn get_chunk(&self, col: u32, row: u32) -> [f32; FEATURE_DIM] {
        let s = self.sample;
        let (x0, y0) = (col as usize * s, row as usize * s);
        self.planes.block_mean(x0, y0, x0 + s, y0 + s)
    }

    pub fn features(&self) -> GridFeatures {
        let (gw, gh) = (self.cols as usize, self.rows as usize);
        let mut features = Array2::<f32>::zeros((gw * gh, FEATURE_DIM));
        let mut lab = Array3::<f32>::zeros((gh, gw, 3));
        let mut edge = Array2::<f32>::zeros((gh, gw));
        let mut alpha = Array2::<f32>::zeros((gh, gw));

        for row in 0..gh {
            for col in 0..gw {
                let cell = self.get_chunk(col as u32, row as u32);
                for (d, v) in cell.iter().enumerate() {
                    features[[row * gw + col, d]] = *v;
                }
                for c in 0..3 {
                    lab[[row, col, c]] = cell[c];
                }
                edge[[row, col]] = cell[3];
                alpha[[row, col]] = cell[4];
            }
        }

        GridFeatures { features, lab, edge, alpha }
    }
}

/// Lanczos resize in premultiplied alpha, so colour stored under transparent
/// pixels never bleeds into the result. Fully transparent output pixels come
/// back black.
fn resize_premultiplied(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let mut premultiplied = image.to_rgba32f();
    for px in premultiplied.pixels_mut() {
        let a = px.0[3];
        for c in &mut px.0[..3] {
            *c *= a;
        }
    }

    let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);
    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        let alpha = quantize(a);
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let a = a.clamp(0.0, 1.0);
        Rgba([quantize(r / a), quantize(g / a), quantize(b / a), alpha])
    })
}

/// Per-cell features of `image` over a `grid_w × grid_h` grid.
pub fn compute_grid_features(
    image: &DynamicImage,
    grid_w: u32,
    grid_h: u32,
    sample: u32,
) -> GridFeatures {
    ImageChunker::new(image, grid_w, grid_h, sample).features()
}

/// Whole-image feature vector, computed at native resolution.
///
/// This is how dataset rows are produced from glyph bitmaps, so a cell and a
/// glyph with the same appearance land on the same vector.
pub fn compute_image_feature(image: &DynamicImage) -> [f32; FEATURE_DIM] {
    let rgba = image.to_rgba8();
    let (w, h) = (rgba.width() as usize, rgba.height() as usize);
    Planes::from_rgba(&rgba).block_mean(0, 0, w, h)
}
