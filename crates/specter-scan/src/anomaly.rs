//! Population anomaly detection.
//!
//! Each cycle fits a fresh isolation forest over the device counts from the
//! most recent scan log entries and scores the current count against it.
//! Nothing is persisted between cycles: refitting every time costs O(window)
//! and avoids stale-model drift.
//!
//! The forest uses a fixed RNG seed so a fixed window always yields the
//! same classification. Multi-point leaves add the average-path adjustment
//! only for queries inside the leaf's observed value range, which lets a
//! constant training window still separate its own value from a far-out
//! query.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use specter_store::InventoryStore;

use crate::config::ScanConfig;
use crate::error::Result;

/// Minimum history before the model considers itself trained.
pub const MIN_TRAINING: usize = 5;

const TREE_COUNT: usize = 100;
const MAX_SUBSAMPLE: usize = 256;
// Fixed seed: a fixed window must always classify the same way.
const FOREST_SEED: u64 = 0x51C0_FFEE;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

enum Node {
    Leaf {
        size: usize,
        min: f64,
        max: f64,
    },
    Split {
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Single-feature isolation forest with a contamination-quantile threshold.
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit a forest over the historical counts.
    ///
    /// Returns `None` when fewer than `MIN_TRAINING` entries exist — the
    /// model is untrained and the caller reports not-anomalous.
    pub fn fit(counts: &[u32], contamination: f64) -> Option<Self> {
        if counts.len() < MIN_TRAINING {
            return None;
        }

        let data: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        let sample_size = data.len().min(MAX_SUBSAMPLE);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(FOREST_SEED);

        let trees = (0..TREE_COUNT)
            .map(|_| {
                let sample = subsample(&data, sample_size, &mut rng);
                build_tree(&sample, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            threshold: 0.0,
        };

        // Threshold at the (1 - contamination) quantile of training scores:
        // roughly the expected outlier share of the window scores above it.
        let mut scores: Vec<f64> = data.iter().map(|&v| forest.score(v)).collect();
        scores.sort_by(f64::total_cmp);
        let contamination = contamination.clamp(0.0, 0.5);
        let rank = ((scores.len() as f64 * (1.0 - contamination)).ceil() as usize)
            .clamp(1, scores.len());
        forest.threshold = scores[rank - 1];

        Some(forest)
    }

    /// Anomaly score in (0, 1]; higher isolates faster.
    pub fn score(&self, value: f64) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, value, 0.0))
            .sum();
        let avg_path = total / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 1.0;
        }
        2f64.powf(-avg_path / norm)
    }

    /// Binary inlier/outlier classification for a device count.
    pub fn is_anomalous(&self, count: u32) -> bool {
        self.score(count as f64) > self.threshold
    }
}

/// Score the current cycle's count against recent history from the store.
///
/// Insufficient history is not an error: it reports not-anomalous.
pub fn assess(store: &dyn InventoryStore, current: u32, config: &ScanConfig) -> Result<bool> {
    let logs = store.recent_logs(config.history_window)?;
    let counts: Vec<u32> = logs.iter().map(|log| log.devices_online).collect();

    match IsolationForest::fit(&counts, config.contamination) {
        Some(model) => Ok(model.is_anomalous(current)),
        None => {
            tracing::debug!(
                history = counts.len(),
                "Insufficient history; reporting not anomalous"
            );
            Ok(false)
        }
    }
}

fn subsample(data: &[f64], size: usize, rng: &mut StdRng) -> Vec<f64> {
    if data.len() <= size {
        return data.to_vec();
    }
    rand::seq::index::sample(rng, data.len(), size)
        .iter()
        .map(|i| data[i])
        .collect()
}

fn build_tree(sample: &[f64], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if sample.len() <= 1 || depth >= max_depth || max - min <= f64::EPSILON {
        return Node::Leaf {
            size: sample.len(),
            min,
            max,
        };
    }

    let split = rng.random_range(min..max);
    let (left, right): (Vec<f64>, Vec<f64>) = sample.iter().copied().partition(|&v| v < split);
    if left.is_empty() || right.is_empty() {
        return Node::Leaf {
            size: sample.len(),
            min,
            max,
        };
    }

    Node::Split {
        value: split,
        left: Box::new(build_tree(&left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, value: f64, depth: f64) -> f64 {
    match node {
        Node::Leaf { size, min, max } => {
            // A query outside the leaf's value range would have been cut
            // away immediately; it gets no average-path credit.
            if *size > 1 && value >= *min && value <= *max {
                depth + average_path_length(*size)
            } else {
                depth
            }
        }
        Node::Split { value: split, left, right } => {
            if value < *split {
                path_length(left, value, depth + 1.0)
            } else {
                path_length(right, value, depth + 1.0)
            }
        }
    }
}

/// Expected path length of an unsuccessful binary search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
