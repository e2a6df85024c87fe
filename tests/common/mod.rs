//! Synthetic glyph dataset written to a temp dir.

#![allow(dead_code)]

use emoji_mosaic::chunk::compute_image_feature;
use emoji_mosaic::dataset::{features_path, index_path};
use emoji_mosaic::MosaicConfig;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tempfile::TempDir;

pub const BLUE_CIRCLE: &str = "\u{1f535}";
pub const RED_CIRCLE: &str = "\u{1f534}";

/// (glyph, asset file, fill color)
const GLYPHS: &[(&str, &str, [u8; 3])] = &[
    ("\u{1f534}", "1f534.png", [221, 46, 68]),
    ("\u{1f535}", "1f535.png", [85, 172, 238]),
    ("\u{1f7e2}", "1f7e2.png", [120, 177, 89]),
    ("\u{1f7e1}", "1f7e1.png", [253, 203, 88]),
    ("\u{26ab}", "26ab.png", [49, 55, 61]),
    ("\u{26aa}", "26aa.png", [230, 231, 232]),
];

/// A filled circle on a transparent 32×32 canvas.
pub fn circle(color: [u8; 3]) -> RgbaImage {
    let mut img = RgbaImage::new(32, 32);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let (dx, dy) = (x as f32 - 15.5, y as f32 - 15.5);
        if dx * dx + dy * dy <= 15.0 * 15.0 {
            *px = Rgba([color[0], color[1], color[2], 255]);
        }
    }
    img
}

pub fn swatch(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(px))
}

pub fn encode(img: RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    let img = DynamicImage::ImageRgba8(img);
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

pub fn png(img: RgbaImage) -> Vec<u8> {
    encode(img, ImageFormat::Png)
}

/// Writes assets and dataset artifacts for `GLYPHS` plus any `extra` glyphs,
/// returning the temp dir and a config pointing at it.
pub fn fixture_with(extra: &[(&str, &str, [u8; 3])]) -> (TempDir, MosaicConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let asset_dir = dir.path().join("assets");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::create_dir_all(&asset_dir).unwrap();

    let mut emoji_list = Vec::new();
    let mut asset_paths = Vec::new();
    let mut bytes = Vec::new();
    for (glyph, file, color) in GLYPHS.iter().chain(extra.iter()) {
        let img = circle(*color);
        img.save(asset_dir.join(file)).unwrap();
        let feature = compute_image_feature(&DynamicImage::ImageRgba8(img));
        bytes.extend(feature.iter().flat_map(|f| f.to_le_bytes()));
        emoji_list.push(glyph.to_string());
        asset_paths.push(file.to_string());
    }

    let index = serde_json::json!({
        "version": "test",
        "emoji_list": emoji_list,
        "asset_paths": asset_paths,
    });
    std::fs::write(index_path(&data_dir, "test"), index.to_string()).unwrap();
    std::fs::write(features_path(&data_dir, "test"), bytes).unwrap();

    let config = MosaicConfig {
        data_dir,
        asset_dir,
        dataset_version: "test".to_string(),
        ..MosaicConfig::default()
    };
    (dir, config)
}

pub fn fixture() -> (TempDir, MosaicConfig) {
    fixture_with(&[])
}
