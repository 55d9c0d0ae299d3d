use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::{Classification, Sample};

/// Defect rates over a batch of samples, in percent.
///
/// # Fields
/// * `overall_defect_rate` - Share of samples in any defect class.
/// * `pass_rate`           - `100 - overall_defect_rate`, or 0 for an empty batch.
/// * `total_tests`         - Number of samples classified.
/// * `defect_breakdown`    - Rate per defect class. Empty for an empty batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefectMetrics {
    pub overall_defect_rate: f64,
    pub pass_rate: f64,
    pub total_tests: usize,
    pub defect_breakdown: BTreeMap<Classification, f64>,
}

impl DefectMetrics {
    pub fn rate(&self, class: Classification) -> f64 {
        self.defect_breakdown.get(&class).copied().unwrap_or(0.0)
    }
}

pub fn calculate_defect_rate(samples: &[Sample]) -> DefectMetrics {
    if samples.is_empty() {
        return DefectMetrics::default();
    }

    let mut counts: BTreeMap<Classification, usize> =
        Classification::DEFECTS.iter().map(|&c| (c, 0)).collect();
    for sample in samples {
        let class = Classification::classify(sample);
        if let Some(count) = counts.get_mut(&class) {
            *count += 1;
        }
    }

    let total = samples.len();
    let percent = |count: usize| count as f64 / total as f64 * 100.0;
    let defects: usize = counts.values().sum();
    let overall_defect_rate = percent(defects);

    DefectMetrics {
        overall_defect_rate,
        pass_rate: 100.0 - overall_defect_rate,
        total_tests: total,
        defect_breakdown: counts.into_iter().map(|(c, n)| (c, percent(n))).collect(),
    }
}
