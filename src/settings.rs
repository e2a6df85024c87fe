//! Per-request conversion settings.

use crate::grid::MAX_GRID_DIM;
use crate::matcher::MatchWeights;
use crate::{MosaicError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source rectangle in image pixels. A non-positive `w` or `h` means the
/// whole image; other out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crop {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl FromStr for Crop {
    type Err = MosaicError;

    /// Parses `x,y,w,h`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i64> = s
            .split(',')
            .map(|p| p.trim().parse::<i64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| MosaicError::InvalidInput(format!("bad crop '{s}': {e}")))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Self { x: *x, y: *y, w: *w, h: *h }),
            _ => Err(MosaicError::InvalidInput(format!("crop needs four values, got '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Transparent,
    Solid,
}

impl FromStr for BackgroundMode {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "transparent" => Ok(Self::Transparent),
            "solid" => Ok(Self::Solid),
            other => Err(MosaicError::Config(format!("unknown background mode '{other}'"))),
        }
    }
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str("transparent"),
            Self::Solid => f.write_str("solid"),
        }
    }
}

/// Conversion settings. Every field is part of the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cap for the longer grid axis, itself capped at 120
    pub max_dim: u32,
    pub grid_w: Option<i64>,
    pub grid_h: Option<i64>,
    pub lock_aspect: bool,
    /// Reserved; currently a pass-through
    pub dithering: bool,
    /// Break ties with a seeded draw instead of taking the lowest index
    pub deterministic: bool,
    pub weights: MatchWeights,
    pub bg_mode: BackgroundMode,
    /// `#rrggbb`, only used with a solid background
    pub bg_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_dim: MAX_GRID_DIM,
            grid_w: None,
            grid_h: None,
            lock_aspect: true,
            dithering: false,
            deterministic: true,
            weights: MatchWeights::default(),
            bg_mode: BackgroundMode::Transparent,
            bg_color: "#ffffff".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
