//! Nearest-glyph matching by weighted squared distance.

use crate::cache::{FeatureCacheKey, FeatureMemoCache};
use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Distances this close to the minimum count as a tie.
pub const TIE_EPSILON: f32 = 1e-6;

/// Relative weight of each feature group in the distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub color: f32,
    pub edge: f32,
    pub alpha: f32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self { color: 1.0, edge: 0.2, alpha: 0.1 }
    }
}

/// Tie-breaking random source. ChaCha8 gives the same stream on every platform.
pub type TieRng = ChaCha8Rng;

pub fn tie_rng(seed: u64) -> TieRng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[inline]
pub fn weighted_distance(
    entry: ArrayView1<f32>,
    target: ArrayView1<f32>,
    weights: &MatchWeights,
) -> f32 {
    let dl = entry[0] - target[0];
    let da = entry[1] - target[1];
    let db = entry[2] - target[2];
    let de = entry[3] - target[3];
    let dalpha = entry[4] - target[4];
    weights.color * (dl * dl + da * da + db * db)
        + weights.edge * de * de
        + weights.alpha * dalpha * dalpha
}

/// Indices of every dataset row within [`TIE_EPSILON`] of the closest one,
/// ascending. Empty only when the dataset is.
pub fn tie_candidates(
    dataset: ArrayView2<f32>,
    target: ArrayView1<f32>,
    weights: &MatchWeights,
) -> Vec<usize> {
    let distances: Vec<f32> = dataset
        .rows()
        .into_iter()
        .map(|row| weighted_distance(row, target, weights))
        .collect();
    let min = distances.iter().copied().fold(f32::INFINITY, f32::min);
    if !min.is_finite() {
        // Nothing comparable, so every row ties
        return (0..distances.len()).collect();
    }
    distances
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d <= min + TIE_EPSILON)
        .map(|(i, _)| i)
        .collect()
}

/// Map each cell feature row to the index of its closest dataset row.
///
/// With `deterministic` set, ties are broken by one draw from `rng` per tied
/// cell in row-major order; a missing `rng` is seeded with 0. Otherwise the
/// lowest tied index wins. A memo hit reuses the recorded index verbatim and
/// consumes no draw, so tied buckets resolve to whichever choice was recorded
/// first. An empty dataset matches nothing and yields no indices.
pub fn match_features(
    cells: ArrayView2<f32>,
    dataset: ArrayView2<f32>,
    weights: &MatchWeights,
    deterministic: bool,
    rng: Option<&mut TieRng>,
    memo: Option<&FeatureMemoCache>,
) -> Vec<usize> {
    if dataset.nrows() == 0 {
        warn!("No dataset rows to match {} cells against", cells.nrows());
        return Vec::new();
    }

    let mut fallback;
    let mut rng = match rng {
        Some(r) => Some(r),
        None if deterministic => {
            fallback = tie_rng(0);
            Some(&mut fallback)
        }
        None => None,
    };

    let mut indices = Vec::with_capacity(cells.nrows());
    let mut memo_hits = 0usize;

    for target in cells.rows() {
        let key = memo.map(|_| {
            FeatureCacheKey::quantize(&[target[0], target[1], target[2], target[3], target[4]])
        });
        if let (Some(memo), Some(key)) = (memo, key.as_ref()) {
            if let Some(idx) = memo.get(key) {
                indices.push(idx);
                memo_hits += 1;
                continue;
            }
        }

        let candidates = tie_candidates(dataset, target, weights);
        let choice = match (candidates.as_slice(), rng.as_deref_mut()) {
            ([only], _) => *only,
            (tied, Some(r)) if deterministic => tied[r.random_range(0..tied.len())],
            (tied, _) => tied[0],
        };
        indices.push(choice);

        if let (Some(memo), Some(key)) = (memo, key) {
            memo.set(key, choice);
        }
    }

    debug!("Matched {} cells ({} memo hits)", indices.len(), memo_hits);
    indices
}
