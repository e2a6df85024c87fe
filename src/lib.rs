//! Photo to emoji mosaic converter using perceptual feature matching.

pub mod cache;
pub mod chunk;
pub mod color;
pub mod config;
pub mod dataset;
pub mod dither;
pub mod edge;
pub mod grid;
pub mod hashing;
pub mod matcher;
pub mod render;
pub mod settings;

pub use cache::{CacheService, ConversionResult};
pub use chunk::ImageChunker;
pub use config::MosaicConfig;
pub use dataset::EmojiDataset;
pub use matcher::MatchWeights;
pub use render::{OutputFormat, RenderSettings};
pub use settings::{BackgroundMode, Crop, Settings};

use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dataset error: {0}")]
    Dataset(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MosaicError>;

/// Outcome of [`Converter::convert`].
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Content hash, the handle for later exports
    pub hash: String,
    pub result: Arc<ConversionResult>,
    /// The result came from the cache and no pipeline stage ran
    pub cache_hit: bool,
}

/// Wire form of a conversion.
#[derive(Debug, Serialize)]
pub struct ConversionSummary {
    pub grid_w: u32,
    pub grid_h: u32,
    pub grid: Vec<String>,
    pub grid_spaced: Vec<String>,
    pub preview_png_base64: Option<String>,
    pub hash: String,
    pub warnings: Vec<String>,
}

impl Conversion {
    pub fn summary(&self) -> ConversionSummary {
        let r = &self.result;
        ConversionSummary {
            grid_w: r.grid_w,
            grid_h: r.grid_h,
            grid: r.grid_compact(),
            grid_spaced: r.grid_spaced.clone(),
            preview_png_base64: r
                .preview_png
                .as_ref()
                .map(|png| base64::engine::general_purpose::STANDARD.encode(png)),
            hash: self.hash.clone(),
            warnings: r.warnings.clone(),
        }
    }
}

/// Conversion service. Owns the dataset and the shared caches; every method
/// takes `&self`, so one instance can serve concurrent requests.
pub struct Converter {
    dataset: EmojiDataset,
    caches: CacheService,
    config: MosaicConfig,
}

impl Converter {
    /// Load the configured dataset and build the caches.
    pub fn new(config: MosaicConfig) -> Result<Self> {
        let dataset =
            EmojiDataset::load(&config.data_dir, &config.asset_dir, &config.dataset_version)?;
        Self::with_dataset(dataset, config)
    }

    pub fn with_dataset(dataset: EmojiDataset, config: MosaicConfig) -> Result<Self> {
        config.validate()?;
        let caches = CacheService::new(
            config.result_cache_size,
            config.image_cache_size,
            config.memo_cache_size,
        )?;
        Ok(Self { dataset, caches, config })
    }

    pub fn dataset(&self) -> &EmojiDataset {
        &self.dataset
    }

    pub fn caches(&self) -> &CacheService {
        &self.caches
    }

    /// Convert an encoded PNG/JPEG into an emoji grid.
    ///
    /// Identical (bytes, crop, settings, dataset version) requests are served
    /// from the result cache. Input errors leave every cache untouched.
    pub fn convert(
        &self,
        image_bytes: &[u8],
        crop: &Crop,
        settings: &Settings,
    ) -> Result<Conversion> {
        if image_bytes.is_empty() {
            return Err(MosaicError::InvalidInput("empty upload".into()));
        }
        if settings.bg_mode == BackgroundMode::Solid {
            render::parse_hex_color(&settings.bg_color)?;
        }

        let version = self.dataset.version();
        let hash = hashing::stable_hash(image_bytes, crop, settings, version)?;
        if let Some(result) = self.caches.results.get(&hash) {
            debug!("Result cache hit for {}", hash);
            return Ok(Conversion { hash, result, cache_hit: true });
        }

        let image = decode(image_bytes)?.to_rgba8();
        let mut warnings = Vec::new();

        let (x, y, w, h) = grid::normalize_crop(crop, image.width(), image.height(), &mut warnings);
        let cropped =
            DynamicImage::ImageRgba8(image::imageops::crop_imm(&image, x, y, w, h).to_image());

        let size = grid::compute_grid_size(
            w,
            h,
            settings.max_dim,
            settings.grid_w,
            settings.grid_h,
            settings.lock_aspect,
        );
        warnings.extend(size.warnings.iter().cloned());

        let mut features = chunk::compute_grid_features(
            &cropped,
            size.grid_w,
            size.grid_h,
            chunk::DEFAULT_SAMPLE,
        )
        .features;
        if settings.dithering {
            warnings.push(dither::NOT_IMPLEMENTED_WARNING.to_string());
            features = dither::apply_dithering(features);
        }

        let mut rng = if settings.deterministic {
            let seed = hashing::deterministic_seed(image_bytes, crop, settings, version)?;
            Some(matcher::tie_rng(seed))
        } else {
            None
        };

        let indices = matcher::match_features(
            features.view(),
            self.dataset.features(),
            &settings.weights,
            settings.deterministic,
            rng.as_mut(),
            Some(&self.caches.memo),
        );

        let grid = self.dataset.indices_to_grid(&indices, size.grid_w);
        let grid_spaced = grid.iter().map(|row| row.join(" ")).collect();
        let preview_png = self.preview(&indices, size.grid_w, size.grid_h, settings)?;

        let result = Arc::new(ConversionResult {
            grid,
            grid_w: size.grid_w,
            grid_h: size.grid_h,
            grid_spaced,
            preview_png,
            dataset_version: version.to_string(),
            warnings,
        });
        self.caches.results.set(hash.clone(), Arc::clone(&result));

        info!(
            "Converted {}x{} crop into {}x{} grid ({})",
            w, h, size.grid_w, size.grid_h, hash
        );
        Ok(Conversion { hash, result, cache_hit: false })
    }

    fn preview(
        &self,
        indices: &[usize],
        grid_w: u32,
        grid_h: u32,
        settings: &Settings,
    ) -> Result<Option<Vec<u8>>> {
        let cell = self.config.preview_cell_size;
        let max_px = u64::from(self.config.preview_max_px);
        let fits = |cells: u32| u64::from(cells) * u64::from(cell) <= max_px;
        if !fits(grid_w) || !fits(grid_h) {
            debug!("Skipping preview for {}x{} grid", grid_w, grid_h);
            return Ok(None);
        }
        let rows: Vec<Vec<usize>> =
            indices.chunks(grid_w as usize).map(<[usize]>::to_vec).collect();
        let render_settings = RenderSettings {
            cell_size: cell,
            bg_mode: settings.bg_mode,
            bg_color: settings.bg_color.clone(),
        };
        render::render_mosaic(
            &rows,
            self.dataset.asset_paths(),
            &render_settings,
            &self.caches.images,
            OutputFormat::Png,
        )
        .map(Some)
    }

    /// Cached result for a content hash.
    pub fn lookup(&self, hash: &str) -> Result<Arc<ConversionResult>> {
        self.caches
            .results
            .get(&hash.to_string())
            .ok_or_else(|| MosaicError::NotFound(format!("unknown hash {hash}")))
    }

    /// Grid as text, one row per line; `spaced` separates glyphs with a space.
    pub fn export_text(&self, hash: &str, spaced: bool) -> Result<String> {
        let result = self.lookup(hash)?;
        let lines = if spaced { result.grid_spaced.clone() } else { result.grid_compact() };
        Ok(lines.join("\n"))
    }

    /// Full-size render of a cached conversion.
    pub fn export_image(
        &self,
        hash: &str,
        format: OutputFormat,
        bg_mode: BackgroundMode,
        bg_color: &str,
    ) -> Result<Vec<u8>> {
        let result = self.lookup(hash)?;
        let rows = self.dataset.grid_to_indices(&result.grid)?;
        let settings = RenderSettings {
            cell_size: self.config.export_cell_size,
            bg_mode,
            bg_color: bg_color.to_string(),
        };
        let assets = self.dataset.asset_paths();
        render::render_mosaic(&rows, assets, &settings, &self.caches.images, format)
    }

    pub fn export_png(
        &self,
        hash: &str,
        bg_mode: BackgroundMode,
        bg_color: &str,
    ) -> Result<Vec<u8>> {
        self.export_image(hash, OutputFormat::Png, bg_mode, bg_color)
    }

    /// JPEG has no alpha channel, so the background is always solid.
    pub fn export_jpeg(&self, hash: &str, bg_color: &str) -> Result<Vec<u8>> {
        self.export_image(hash, OutputFormat::Jpeg, BackgroundMode::Solid, bg_color)
    }
}

/// Decode a PNG or JPEG payload.
fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes)
        .map_err(|_| MosaicError::InvalidInput("unrecognized image format".into()))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(MosaicError::InvalidInput(format!("unsupported image format {format:?}")));
    }
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MosaicError::InvalidInput(format!("unable to decode image: {e}")))
}
