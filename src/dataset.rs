//! Precomputed emoji feature table.
//!
//! Loaded once from two artifacts in the data directory:
//! `emoji_index_<version>.json` (version tag, glyphs, asset file names) and
//! `emoji_features_<version>.bin` (little-endian `f32`, five per glyph).

use crate::chunk::FEATURE_DIM;
use crate::{MosaicError, Result};
use ndarray::{Array2, ArrayView2};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Deserialize)]
struct DatasetIndex {
    version: String,
    emoji_list: Vec<String>,
    asset_paths: Vec<String>,
}

pub fn index_path(data_dir: &Path, version: &str) -> PathBuf {
    data_dir.join(format!("emoji_index_{version}.json"))
}

pub fn features_path(data_dir: &Path, version: &str) -> PathBuf {
    data_dir.join(format!("emoji_features_{version}.bin"))
}

#[derive(Debug)]
pub struct EmojiDataset {
    version: String,
    emoji_list: Vec<String>,
    asset_paths: Vec<PathBuf>,
    features: Array2<f32>,
    lookup: HashMap<String, usize>,
}

impl EmojiDataset {
    /// Load and validate the artifacts for `version`. Asset names are
    /// resolved against `asset_dir`.
    pub fn load(
        data_dir: impl AsRef<Path>,
        asset_dir: impl AsRef<Path>,
        version: &str,
    ) -> Result<Self> {
        let index_file = index_path(data_dir.as_ref(), version);
        let features_file = features_path(data_dir.as_ref(), version);
        for path in [&index_file, &features_file] {
            if !path.exists() {
                let msg = format!("missing dataset artifact: {}", path.display());
                return Err(MosaicError::Dataset(msg));
            }
        }

        let index: DatasetIndex = serde_json::from_str(&std::fs::read_to_string(&index_file)?)?;

        let bytes = std::fs::read(&features_file)?;
        let row_bytes = FEATURE_DIM * 4;
        if bytes.len() % row_bytes != 0 {
            return Err(MosaicError::Dataset(format!(
                "feature table is {} bytes, not a multiple of {row_bytes}",
                bytes.len()
            )));
        }
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let features = Array2::from_shape_vec((bytes.len() / row_bytes, FEATURE_DIM), floats)
            .map_err(|e| MosaicError::Dataset(e.to_string()))?;

        let asset_dir = asset_dir.as_ref();
        let asset_paths = index.asset_paths.iter().map(|p| asset_dir.join(p)).collect();

        let dataset = Self::from_parts(index.version, index.emoji_list, asset_paths, features)?;
        info!("Loaded emoji dataset {} with {} glyphs", dataset.version, dataset.len());
        Ok(dataset)
    }

    /// Build from in-memory parts, enforcing the shape invariants.
    pub fn from_parts(
        version: String,
        emoji_list: Vec<String>,
        asset_paths: Vec<PathBuf>,
        features: Array2<f32>,
    ) -> Result<Self> {
        if features.ncols() != FEATURE_DIM {
            return Err(MosaicError::Dataset(format!(
                "feature rows have {} columns, expected {FEATURE_DIM}",
                features.ncols()
            )));
        }
        if features.nrows() == 0 {
            return Err(MosaicError::Dataset(format!("dataset {version} has no glyphs")));
        }
        if emoji_list.len() != features.nrows() || asset_paths.len() != features.nrows() {
            return Err(MosaicError::Dataset(format!(
                "size mismatch: {} glyphs, {} asset paths, {} feature rows",
                emoji_list.len(),
                asset_paths.len(),
                features.nrows()
            )));
        }

        let mut lookup = HashMap::with_capacity(emoji_list.len());
        for (i, glyph) in emoji_list.iter().enumerate() {
            if lookup.insert(glyph.clone(), i).is_some() {
                return Err(MosaicError::Dataset(format!("duplicate glyph {glyph}")));
            }
        }

        Ok(Self { version, emoji_list, asset_paths, features, lookup })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.emoji_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emoji_list.is_empty()
    }

    pub fn emoji_list(&self) -> &[String] {
        &self.emoji_list
    }

    pub fn asset_paths(&self) -> &[PathBuf] {
        &self.asset_paths
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn index_of(&self, glyph: &str) -> Option<usize> {
        self.lookup.get(glyph).copied()
    }

    /// Row-major flat indices to a glyph grid.
    pub fn indices_to_grid(&self, indices: &[usize], grid_w: u32) -> Vec<Vec<String>> {
        indices
            .chunks(grid_w.max(1) as usize)
            .map(|row| row.iter().map(|&i| self.emoji_list[i].clone()).collect())
            .collect()
    }

    /// Glyph grid back to indices.
    pub fn grid_to_indices(&self, grid: &[Vec<String>]) -> Result<Vec<Vec<usize>>> {
        grid.iter()
            .map(|row| {
                row.iter()
                    .map(|g| {
                        self.index_of(g).ok_or_else(|| {
                            let msg = format!("glyph {g} not in dataset {}", self.version);
                            MosaicError::Dataset(msg)
                        })
                    })
                    .collect()
            })
            .collect()
    }
}
