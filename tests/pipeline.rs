mod common;

use common::{encode, fixture, fixture_with, png, swatch, BLUE_CIRCLE};
use emoji_mosaic::chunk::{compute_grid_features, DEFAULT_SAMPLE};
use emoji_mosaic::matcher::{match_features, tie_rng};
use emoji_mosaic::{
    BackgroundMode, Conversion, Converter, Crop, EmojiDataset, MatchWeights, MosaicConfig,
    MosaicError, Settings,
};
use image::{DynamicImage, ImageFormat};
use std::sync::Arc;

fn capped(max_dim: u32) -> Settings {
    Settings { max_dim, ..Settings::default() }
}

fn convert(converter: &Converter, bytes: &[u8], settings: &Settings) -> Conversion {
    converter.convert(bytes, &Crop::default(), settings).unwrap()
}

#[test]
fn blue_swatch_matches_blue_circle() {
    let (_dir, config) = fixture();
    let dataset = EmojiDataset::load(&config.data_dir, &config.asset_dir, "test").unwrap();

    let image = DynamicImage::ImageRgba8(swatch(20, 20, [60, 140, 220, 255]));
    let cells = compute_grid_features(&image, 2, 2, DEFAULT_SAMPLE).features;
    let mut rng = tie_rng(123);
    let weights = MatchWeights::default();
    let indices =
        match_features(cells.view(), dataset.features(), &weights, true, Some(&mut rng), None);

    let grid = dataset.indices_to_grid(&indices, 2);
    assert!(grid.iter().flatten().all(|g| g == BLUE_CIRCLE), "{grid:?}");
}

#[test]
fn convert_end_to_end() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();

    let bytes = png(swatch(40, 20, [60, 140, 220, 255]));
    let settings = Settings { max_dim: 8, ..Settings::default() };
    let conv = converter.convert(&bytes, &Crop::default(), &settings).unwrap();

    let r = &conv.result;
    assert!(!conv.cache_hit);
    assert_eq!((r.grid_w, r.grid_h), (8, 4));
    assert_eq!(r.grid.len(), 4);
    assert!(r.grid.iter().all(|row| row.len() == 8));
    assert!(r.grid.iter().flatten().all(|g| g == BLUE_CIRCLE));
    assert_eq!(r.grid_spaced[0], vec![BLUE_CIRCLE; 8].join(" "));
    assert_eq!(r.dataset_version, "test");
    assert!(r.warnings.is_empty());

    let preview = image::load_from_memory(r.preview_png.as_ref().unwrap()).unwrap();
    assert_eq!((preview.width(), preview.height()), (80, 40));
}

#[test]
fn second_identical_request_is_a_cache_hit() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(30, 30, [200, 40, 60, 255]));
    let settings = Settings { max_dim: 6, ..Settings::default() };

    let first = converter.convert(&bytes, &Crop::default(), &settings).unwrap();
    let memo_entries = converter.caches().memo.len();
    let second = converter.convert(&bytes, &Crop::default(), &settings).unwrap();

    assert_eq!(first.hash, second.hash);
    assert_eq!(first.result.grid, second.result.grid);
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(Arc::ptr_eq(&first.result, &second.result));
    assert_eq!(converter.caches().memo.len(), memo_entries);
    assert_eq!(converter.caches().results.len(), 1);
}

#[test]
fn settings_change_the_hash() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(16, 16, [10, 200, 10, 255]));

    let a = convert(&converter, &bytes, &capped(4));
    let b = convert(&converter, &bytes, &capped(5));
    assert_ne!(a.hash, b.hash);
    assert!(!b.cache_hit);
    assert_eq!(converter.caches().results.len(), 2);
}

#[test]
fn separate_converters_agree() {
    let (_dir, config) = fixture();
    let bytes = png(swatch(24, 12, [250, 250, 250, 255]));
    let settings = Settings { max_dim: 10, ..Settings::default() };

    let a = convert(&Converter::new(config.clone()).unwrap(), &bytes, &settings);
    let b = convert(&Converter::new(config).unwrap(), &bytes, &settings);
    assert_eq!(a.hash, b.hash);
    assert_eq!(a.result.grid, b.result.grid);
}

#[test]
fn tied_glyphs_resolve_reproducibly() {
    // Two glyphs with identical artwork always tie
    let twins = [("\u{1f499}", "1f499.png", [85, 172, 238])];
    let (_dir, config) = fixture_with(&twins);
    let bytes = png(swatch(20, 20, [60, 140, 220, 255]));
    let settings = Settings { max_dim: 4, ..Settings::default() };

    let first = convert(&Converter::new(config.clone()).unwrap(), &bytes, &settings);
    let second = convert(&Converter::new(config).unwrap(), &bytes, &settings);
    assert_eq!(first.result.grid, second.result.grid);
    assert!(first
        .result
        .grid
        .iter()
        .flatten()
        .all(|g| g == BLUE_CIRCLE || g == "\u{1f499}"));
}

#[test]
fn text_exports() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(30, 20, [60, 140, 220, 255]));
    let conv = convert(&converter, &bytes, &capped(3));

    let compact = converter.export_text(&conv.hash, false).unwrap();
    let spaced = converter.export_text(&conv.hash, true).unwrap();
    let row = BLUE_CIRCLE.repeat(3);
    assert_eq!(compact, format!("{row}\n{row}"));
    let row = [BLUE_CIRCLE; 3].join(" ");
    assert_eq!(spaced, format!("{row}\n{row}"));
}

#[test]
fn image_exports() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(30, 20, [60, 140, 220, 255]));
    let conv = convert(&converter, &bytes, &capped(3));

    let png_out = converter.export_png(&conv.hash, BackgroundMode::Transparent, "#ffffff").unwrap();
    let img = image::load_from_memory(&png_out).unwrap();
    assert!(matches!(img, DynamicImage::ImageRgba8(_)));
    assert_eq!((img.width(), img.height()), (3 * 48, 2 * 48));
    // Circle corners are transparent
    assert_eq!(img.to_rgba8().get_pixel(0, 0).0[3], 0);

    let solid = converter.export_png(&conv.hash, BackgroundMode::Solid, "#000000").unwrap();
    let img = image::load_from_memory(&solid).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);

    let jpg = converter.export_jpeg(&conv.hash, "#ffffff").unwrap();
    let img = image::load_from_memory(&jpg).unwrap();
    assert!(matches!(img, DynamicImage::ImageRgb8(_)));
    assert_eq!((img.width(), img.height()), (144, 96));
}

#[test]
fn jpeg_export_rejects_transparent_background() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let settings = Settings { max_dim: 4, ..Settings::default() };
    let conv = convert(&converter, &png(swatch(8, 8, [0, 0, 0, 255])), &settings);

    let res = converter.export_image(
        &conv.hash,
        emoji_mosaic::OutputFormat::Jpeg,
        BackgroundMode::Transparent,
        "#ffffff",
    );
    assert!(matches!(res, Err(MosaicError::Config(_))));
}

#[test]
fn unknown_hash_is_not_found() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    assert!(matches!(converter.export_text("deadbeef", false), Err(MosaicError::NotFound(_))));
    assert!(matches!(converter.export_jpeg("deadbeef", "#ffffff"), Err(MosaicError::NotFound(_))));
}

#[test]
fn bad_payloads_are_input_errors_and_leave_caches_empty() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let settings = Settings::default();

    let gif = encode(swatch(4, 4, [1, 2, 3, 255]), ImageFormat::Gif);
    for payload in [Vec::new(), b"definitely not an image".to_vec(), gif] {
        let res = converter.convert(&payload, &Crop::default(), &settings);
        assert!(matches!(res, Err(MosaicError::InvalidInput(_))), "{res:?}");
    }

    // Valid PNG signature followed by garbage
    let mut truncated = png(swatch(4, 4, [1, 2, 3, 255]));
    truncated.truncate(20);
    assert!(matches!(
        converter.convert(&truncated, &Crop::default(), &settings),
        Err(MosaicError::InvalidInput(_))
    ));

    assert!(converter.caches().results.is_empty());
    assert!(converter.caches().memo.is_empty());
}

#[test]
fn malformed_background_color_fails_before_matching() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let settings = Settings {
        max_dim: 4,
        bg_mode: BackgroundMode::Solid,
        bg_color: "#12345".to_string(),
        ..Settings::default()
    };

    let bytes = png(swatch(8, 8, [60, 140, 220, 255]));
    let res = converter.convert(&bytes, &Crop::default(), &settings);
    assert!(matches!(res, Err(MosaicError::Config(_))), "{res:?}");
    assert!(converter.caches().results.is_empty());
    assert!(converter.caches().memo.is_empty());
    assert!(converter.caches().images.is_empty());

    // Transparent mode never reads the color
    let settings = Settings { bg_mode: BackgroundMode::Transparent, ..settings };
    assert!(converter.convert(&bytes, &Crop::default(), &settings).is_ok());
}

#[test]
fn jpeg_input_is_accepted() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = encode(swatch(16, 16, [60, 140, 220, 255]), ImageFormat::Jpeg);
    let conv = convert(&converter, &bytes, &capped(2));
    assert_eq!((conv.result.grid_w, conv.result.grid_h), (2, 2));
}

#[test]
fn crop_is_clamped_with_warning() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(20, 10, [60, 140, 220, 255]));
    let crop = Crop { x: 15, y: 0, w: 50, h: 50 };

    let conv = converter.convert(&bytes, &crop, &Settings::default()).unwrap();
    let r = &conv.result;
    // Clamped to a 5x10 region, portrait
    assert_eq!((r.grid_w, r.grid_h), (60, 120));
    assert!(r.warnings.iter().any(|w| w.contains("Crop rectangle adjusted")));
}

#[test]
fn clamp_and_dither_warnings_are_kept() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(20, 10, [60, 140, 220, 255]));
    let settings =
        Settings { grid_w: Some(500), grid_h: Some(3), dithering: true, ..Settings::default() };

    let conv = converter.convert(&bytes, &Crop::default(), &settings).unwrap();
    assert_eq!((conv.result.grid_w, conv.result.grid_h), (120, 3));
    assert_eq!(conv.result.warnings.len(), 2);
    assert!(conv.result.warnings[1].contains("Dithering"));

    // Warnings survive a cache hit
    let again = converter.convert(&bytes, &Crop::default(), &settings).unwrap();
    assert!(again.cache_hit);
    assert_eq!(again.result.warnings, conv.result.warnings);
}

#[test]
fn oversized_preview_is_omitted() {
    let (_dir, config) = fixture();
    let config = MosaicConfig { preview_max_px: 50, ..config };
    let converter = Converter::new(config).unwrap();
    let bytes = png(swatch(10, 10, [60, 140, 220, 255]));

    let small = convert(&converter, &bytes, &capped(5));
    assert!(small.result.preview_png.is_some());
    let large = convert(&converter, &bytes, &capped(6));
    assert!(large.result.preview_png.is_none());
    assert!(large.summary().preview_png_base64.is_none());
}

#[test]
fn missing_dataset_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = MosaicConfig { data_dir: dir.path().to_path_buf(), ..MosaicConfig::default() };
    assert!(matches!(Converter::new(config), Err(MosaicError::Dataset(_))));
}

#[test]
fn converter_serves_concurrent_requests() {
    let (_dir, config) = fixture();
    let converter = Converter::new(config).unwrap();
    let colors = [
        [60, 140, 220, 255],
        [221, 46, 68, 255],
        [120, 177, 89, 255],
        [60, 140, 220, 255],
    ];

    let hashes: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = colors
            .iter()
            .map(|&c| {
                let converter = &converter;
                s.spawn(move || {
                    let bytes = png(swatch(12, 12, c));
                    let settings = Settings { max_dim: 4, ..Settings::default() };
                    converter.convert(&bytes, &Crop::default(), &settings).unwrap().hash
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(hashes[0], hashes[3]);
    assert_ne!(hashes[0], hashes[1]);
    for hash in &hashes {
        assert!(converter.export_text(hash, false).is_ok());
    }
}
