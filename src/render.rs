//! Mosaic rendering - composes glyph bitmaps into a PNG or JPEG canvas.

use crate::cache::{EmojiImageCache, EmojiImageKey};
use crate::settings::BackgroundMode;
use crate::{MosaicError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl FromStr for OutputFormat {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(MosaicError::Config(format!("unsupported output format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Edge length of one cell in output pixels
    pub cell_size: u32,
    pub bg_mode: BackgroundMode,
    pub bg_color: String,
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(color: &str) -> Result<[u8; 3]> {
    let value = color.trim_start_matches('#');
    let bad = || MosaicError::Config(format!("invalid color '{color}', expected #rrggbb"));
    if value.len() != 6 || !value.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| bad());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Decode the glyph at `path` resized to `size × size`, at most once per
/// (path, size) while it stays cached.
pub fn load_emoji_image(path: &Path, size: u32, cache: &EmojiImageCache) -> Result<Arc<RgbaImage>> {
    let key = EmojiImageKey { path: path.to_path_buf(), size };
    if let Some(img) = cache.get(&key) {
        return Ok(img);
    }

    debug!("Decoding glyph {} at {}px", path.display(), size);
    let decoded = image::open(path)?.to_rgba8();
    let resized = Arc::new(imageops::resize(&decoded, size, size, FilterType::Lanczos3));
    cache.set(key, Arc::clone(&resized));
    Ok(resized)
}

/// Render a grid of dataset indices.
///
/// PNG output is RGBA: a solid background is painted first when requested,
/// then every glyph is alpha-composited. JPEG output is RGB, needs a solid
/// background, and pastes glyphs with their alpha dropped.
pub fn render_mosaic(
    grid: &[Vec<usize>],
    asset_paths: &[PathBuf],
    settings: &RenderSettings,
    cache: &EmojiImageCache,
    format: OutputFormat,
) -> Result<Vec<u8>> {
    let grid_h = grid.len() as u32;
    let grid_w = grid.first().map_or(0, |row| row.len()) as u32;
    if grid_w == 0 || grid_h == 0 || settings.cell_size == 0 {
        return Err(MosaicError::InvalidInput("nothing to render".into()));
    }
    let canvas_axis = |cells: u32| {
        cells.checked_mul(settings.cell_size).ok_or_else(|| {
            MosaicError::InvalidInput(format!(
                "{cells} cells of {}px overflow the canvas",
                settings.cell_size
            ))
        })
    };
    let (width, height) = (canvas_axis(grid_w)?, canvas_axis(grid_h)?);

    let bg = match settings.bg_mode {
        BackgroundMode::Solid => Some(parse_hex_color(&settings.bg_color)?),
        BackgroundMode::Transparent => None,
    };

    let glyph = |idx: usize| -> Result<Arc<RgbaImage>> {
        let path = asset_paths
            .get(idx)
            .ok_or_else(|| MosaicError::Dataset(format!("glyph index {idx} has no asset")))?;
        load_emoji_image(path, settings.cell_size, cache)
    };

    let mut out = Vec::new();
    match format {
        OutputFormat::Png => {
            let fill = bg.map_or(Rgba([0, 0, 0, 0]), |[r, g, b]| Rgba([r, g, b, 255]));
            let mut canvas = RgbaImage::from_pixel(width, height, fill);
            for (row, cells) in grid.iter().enumerate() {
                for (col, &idx) in cells.iter().enumerate() {
                    let img = glyph(idx)?;
                    let (x, y) = (col as u32 * settings.cell_size, row as u32 * settings.cell_size);
                    imageops::overlay(&mut canvas, &*img, x as i64, y as i64);
                }
            }
            DynamicImage::ImageRgba8(canvas)
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            let [r, g, b] = bg.ok_or_else(|| {
                MosaicError::Config("JPEG export requires a solid background".into())
            })?;
            let mut canvas = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
            for (row, cells) in grid.iter().enumerate() {
                for (col, &idx) in cells.iter().enumerate() {
                    let flat = DynamicImage::ImageRgba8((*glyph(idx)?).clone()).to_rgb8();
                    let (x, y) = (col as u32 * settings.cell_size, row as u32 * settings.cell_size);
                    imageops::replace(&mut canvas, &flat, x as i64, y as i64);
                }
            }
            canvas.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
        }
    }

    Ok(out)
}
