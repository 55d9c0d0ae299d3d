//! Isolation forest outlier detector over (voltage, current, resistance).
//!
//! Each tree isolates a subsample by random axis-aligned splits; points that
//! isolate in few splits are anomalous. The outlier cut-off is the
//! `1 - contamination` quantile of the scores of the data the forest was fit on.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::math::stats;

pub const FEATURES: usize = 3;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Fitted forest plus its decision threshold.
///
/// # Fields
/// * `trees`       - One isolation tree per estimator.
/// * `sample_size` - Subsample size each tree was grown on.
/// * `threshold`   - Scores strictly above this are outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    pub threshold: f64,
}

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` points.
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

impl IsolationForest {
    pub fn fit(rows: &[[f64; FEATURES]], n_trees: usize, max_samples: usize, contamination: f64, seed: u64) -> IsolationForest {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = max_samples.min(rows.len()).max(1);
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .map(|_| {
                let picked = if rows.is_empty() {
                    Vec::new()
                } else {
                    index::sample(&mut rng, rows.len(), sample_size.min(rows.len())).into_vec()
                };
                grow(rows, picked, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest { trees, sample_size, threshold: f64::INFINITY };
        let scores: Vec<f64> = rows.iter().map(|r| forest.score(r)).collect();
        forest.threshold = stats::quantile(&scores, 1.0 - contamination).unwrap_or(f64::INFINITY);
        forest
    }

    /// Anomaly score in (0, 1]; higher is more anomalous.
    pub fn score(&self, row: &[f64; FEATURES]) -> f64 {
        let norm = average_path_length(self.sample_size);
        if norm == 0.0 || self.trees.is_empty() {
            return 0.5;
        }
        let mean_depth = self.trees.iter().map(|t| path_length(t, row, 0)).sum::<f64>() / self.trees.len() as f64;
        2f64.powf(-mean_depth / norm)
    }

    pub fn is_outlier(&self, row: &[f64; FEATURES]) -> bool {
        self.score(row) > self.threshold
    }
}

fn grow(rows: &[[f64; FEATURES]], picked: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || picked.len() <= 1 {
        return Node::Leaf { size: picked.len() };
    }

    // start at a random feature and take the first one that still varies
    let start = rng.gen_range(0..FEATURES);
    let split = (0..FEATURES).map(|k| (start + k) % FEATURES).find_map(|feature| {
        let values: Vec<f64> = picked.iter().map(|&i| rows[i][feature]).collect();
        let (lo, hi) = stats::min_max(&values)?;
        (lo < hi).then_some((feature, lo, hi))
    });
    let Some((feature, lo, hi)) = split else {
        return Node::Leaf { size: picked.len() };
    };

    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) = picked.into_iter().partition(|&i| rows[i][feature] < threshold);
    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, left, depth + 1, limit, rng)),
        right: Box::new(grow(rows, right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, row: &[f64; FEATURES], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split { feature, threshold, left, right } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Vec<[f64; FEATURES]> {
        (0..200)
            .map(|i| {
                let t = i as f64 * 0.1;
                [1000.0 + t.sin(), 0.001 + 1e-5 * t.cos(), 1e6 + 100.0 * (2.0 * t).sin()]
            })
            .collect()
    }

    #[test]
    fn far_point_is_flagged() {
        let rows = cluster();
        let forest = IsolationForest::fit(&rows, 100, 256, 0.1, 42);
        assert!(forest.is_outlier(&[5000.0, 0.5, 1e10]));
        assert!(forest.score(&[5000.0, 0.5, 1e10]) > forest.score(&rows[100]));
    }

    #[test]
    fn flags_about_the_contamination_fraction() {
        let rows = cluster();
        let forest = IsolationForest::fit(&rows, 100, 256, 0.1, 42);
        let flagged = rows.iter().filter(|r| forest.is_outlier(r)).count();
        assert!(flagged <= 20, "flagged {flagged}");
    }

    #[test]
    fn same_seed_same_forest() {
        let rows = cluster();
        assert_eq!(IsolationForest::fit(&rows, 10, 64, 0.1, 7), IsolationForest::fit(&rows, 10, 64, 0.1, 7));
    }

    #[test]
    fn constant_data_flags_nothing() {
        let rows = vec![[1.0, 2.0, 3.0]; 30];
        let forest = IsolationForest::fit(&rows, 20, 256, 0.1, 42);
        assert!(rows.iter().all(|r| !forest.is_outlier(r)));
    }

    #[test]
    fn path_length_normalizer() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }
}
