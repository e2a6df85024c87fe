//! Process configuration: dataset location, cache capacities and render sizes.

use crate::{MosaicError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Largest accepted cell edge for previews and exports, in pixels.
pub const MAX_CELL_SIZE: u32 = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Directory holding `emoji_index_<v>.json` and `emoji_features_<v>.bin`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory the index's asset paths are relative to
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    #[serde(default = "default_dataset_version")]
    pub dataset_version: String,

    #[serde(default = "default_result_cache_size")]
    pub result_cache_size: usize,
    #[serde(default = "default_image_cache_size")]
    pub image_cache_size: usize,
    #[serde(default = "default_memo_cache_size")]
    pub memo_cache_size: usize,

    /// Cell size of full-size PNG/JPEG exports
    #[serde(default = "default_export_cell_size")]
    pub export_cell_size: u32,
    #[serde(default = "default_preview_cell_size")]
    pub preview_cell_size: u32,
    /// Previews are skipped when either canvas axis would exceed this
    #[serde(default = "default_preview_max_px")]
    pub preview_max_px: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets/twemoji_png")
}
fn default_dataset_version() -> String {
    "v1".to_string()
}
fn default_result_cache_size() -> usize {
    128
}
fn default_image_cache_size() -> usize {
    1024
}
fn default_memo_cache_size() -> usize {
    4096
}
fn default_export_cell_size() -> u32 {
    48
}
fn default_preview_cell_size() -> u32 {
    10
}
fn default_preview_max_px() -> u32 {
    1600
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            asset_dir: default_asset_dir(),
            dataset_version: default_dataset_version(),
            result_cache_size: default_result_cache_size(),
            image_cache_size: default_image_cache_size(),
            memo_cache_size: default_memo_cache_size(),
            export_cell_size: default_export_cell_size(),
            preview_cell_size: default_preview_cell_size(),
            preview_max_px: default_preview_max_px(),
        }
    }
}

impl MosaicConfig {
    /// Read a TOML file; a missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| MosaicError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("result_cache_size", self.result_cache_size),
            ("image_cache_size", self.image_cache_size),
            ("memo_cache_size", self.memo_cache_size),
            ("export_cell_size", self.export_cell_size as usize),
            ("preview_cell_size", self.preview_cell_size as usize),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(MosaicError::Config(format!("{name} must be positive")));
            }
        }
        for (name, value) in [
            ("export_cell_size", self.export_cell_size),
            ("preview_cell_size", self.preview_cell_size),
        ] {
            if value > MAX_CELL_SIZE {
                return Err(MosaicError::Config(format!(
                    "{name} is {value}, at most {MAX_CELL_SIZE} is supported"
                )));
            }
        }
        Ok(())
    }
}
