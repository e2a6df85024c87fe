//! Process-wide LRU caches: conversion results, decoded glyph bitmaps and
//! per-bucket match memoization.
//!
//! Every cache is one `LruCache` behind one mutex. Lookups promote the entry,
//! inserts evict the least recently used entry once capacity is exceeded.

use crate::{MosaicError, Result};
use image::RgbaImage;
use lru::LruCache;
use serde::Serialize;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct LruStore<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> LruStore<K, V> {
    pub fn new(capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity)
            .ok_or_else(|| MosaicError::Config("cache capacity must be positive".into()))?;
        Ok(Self { inner: Mutex::new(LruCache::new(cap)) })
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        // Entries are plain values, a panic elsewhere cannot leave one half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Coarse bucket of a cell feature vector.
///
/// Lab channels are rounded to steps of 2, edge energy and alpha coverage to
/// hundredths, so near-identical cells share a memoized match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureCacheKey {
    pub lab: [i32; 3],
    pub edge: i32,
    pub alpha: i32,
}

impl FeatureCacheKey {
    pub fn quantize(feature: &[f32]) -> Self {
        let q = |v: f32| v.round_ties_even() as i32;
        Self {
            lab: [q(feature[0] / 2.0), q(feature[1] / 2.0), q(feature[2] / 2.0)],
            edge: q(feature[3] * 100.0),
            alpha: q(feature[4] * 100.0),
        }
    }
}

pub type FeatureMemoCache = LruStore<FeatureCacheKey, usize>;

/// A glyph bitmap decoded from `path` and resized to `size × size`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmojiImageKey {
    pub path: PathBuf,
    pub size: u32,
}

pub type EmojiImageCache = LruStore<EmojiImageKey, Arc<RgbaImage>>;

/// Immutable output of one conversion, shared by every later export.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub grid: Vec<Vec<String>>,
    pub grid_w: u32,
    pub grid_h: u32,
    pub grid_spaced: Vec<String>,
    #[serde(skip)]
    pub preview_png: Option<Vec<u8>>,
    pub dataset_version: String,
    pub warnings: Vec<String>,
}

impl ConversionResult {
    /// Rows with glyphs concatenated.
    pub fn grid_compact(&self) -> Vec<String> {
        self.grid.iter().map(|row| row.concat()).collect()
    }
}

pub type ConversionCache = LruStore<String, Arc<ConversionResult>>;

/// The three shared caches, built once and handed to every request path.
pub struct CacheService {
    pub results: ConversionCache,
    pub images: EmojiImageCache,
    pub memo: FeatureMemoCache,
}

impl CacheService {
    pub fn new(result_size: usize, image_size: usize, memo_size: usize) -> Result<Self> {
        Ok(Self {
            results: LruStore::new(result_size)?,
            images: LruStore::new(image_size)?,
            memo: LruStore::new(memo_size)?,
        })
    }
}
