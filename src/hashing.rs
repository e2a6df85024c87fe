//! Content hash and tie-break seed for a conversion request.
//!
//! Both digests cover the raw image bytes followed by the canonical JSON of
//! `{crop, dataset_version, settings}` (sorted keys, no whitespace).

use crate::settings::{Crop, Settings};
use crate::Result;
use serde_json::{Map, Value};

// Separate key-derivation context for the seed so it is not a prefix of the hash
const SEED_CONTEXT: &str = "emoji-mosaic 2024 tie-break seed";

fn canonical_payload(crop: &Crop, settings: &Settings, dataset_version: &str) -> Result<Vec<u8>> {
    // serde_json::Map is a BTreeMap, so keys serialize sorted at every level
    let mut payload = Map::new();
    payload.insert("crop".into(), serde_json::to_value(crop)?);
    payload.insert("settings".into(), serde_json::to_value(settings)?);
    payload.insert("dataset_version".into(), Value::String(dataset_version.to_string()));
    Ok(serde_json::to_vec(&Value::Object(payload))?)
}

/// 128-bit hex digest identifying a conversion request.
pub fn stable_hash(
    image_bytes: &[u8],
    crop: &Crop,
    settings: &Settings,
    dataset_version: &str,
) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(image_bytes);
    hasher.update(&canonical_payload(crop, settings, dataset_version)?);
    let mut digest = [0u8; 16];
    hasher.finalize_xof().fill(&mut digest);
    Ok(hex::encode(digest))
}

/// 64-bit seed for the tie-breaking generator, derived from the same inputs.
pub fn deterministic_seed(
    image_bytes: &[u8],
    crop: &Crop,
    settings: &Settings,
    dataset_version: &str,
) -> Result<u64> {
    let mut hasher = blake3::Hasher::new_derive_key(SEED_CONTEXT);
    hasher.update(image_bytes);
    hasher.update(&canonical_payload(crop, settings, dataset_version)?);
    let mut digest = [0u8; 8];
    hasher.finalize_xof().fill(&mut digest);
    Ok(u64::from_be_bytes(digest))
}
