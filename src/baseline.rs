use serde::{Deserialize, Serialize};

use crate::math::stats;
use crate::session::{Channel, Electrical, ProcessedSession, Sample};

/// Mean and sample standard deviation of each electrical channel.
/// A statistic that cannot be computed (too few samples, non-finite) is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub voltage_mean: Option<f64>,
    pub voltage_std: Option<f64>,
    pub current_mean: Option<f64>,
    pub current_std: Option<f64>,
    pub resistance_mean: Option<f64>,
    pub resistance_std: Option<f64>,
}

impl SummaryStatistics {
    pub fn of(samples: &[Sample]) -> SummaryStatistics {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let column = |channel: Channel| samples.iter().map(|s| s.get(channel)).collect::<Vec<f64>>();
        let (v, c, r) = (
            column(Channel::Voltage),
            column(Channel::Current),
            column(Channel::Resistance),
        );
        SummaryStatistics {
            voltage_mean: finite(stats::mean(&v)),
            voltage_std: finite(stats::sample_std(&v)),
            current_mean: finite(stats::mean(&c)),
            current_std: finite(stats::sample_std(&c)),
            resistance_mean: finite(stats::mean(&r)),
            resistance_std: finite(stats::sample_std(&r)),
        }
    }

    /// The six statistics in a fixed order, keyed by name.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("voltage_mean", self.voltage_mean),
            ("voltage_std", self.voltage_std),
            ("current_mean", self.current_mean),
            ("current_std", self.current_std),
            ("resistance_mean", self.resistance_mean),
            ("resistance_std", self.resistance_std),
        ]
    }
}

/// The reference every analyzed session is compared against.
///
/// # Fields
/// * `features`   - Raw voltage/current/resistance rows of the reference session.
/// * `normalized` - Normalized rows of the same session.
/// * `statistics` - Summary statistics of the raw rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub features: Vec<Electrical>,
    pub normalized: Vec<Sample>,
    pub statistics: SummaryStatistics,
}

impl Baseline {
    /// Builds a baseline from a preprocessed session; `None` if it is empty.
    pub fn from_session(session: &ProcessedSession) -> Option<Baseline> {
        if session.is_empty() {
            return None;
        }
        let raw = session.raw_samples();
        Some(Baseline {
            features: raw
                .iter()
                .map(|s| Electrical {
                    voltage: s.voltage,
                    current: s.current,
                    resistance: s.resistance,
                })
                .collect(),
            normalized: session.samples.iter().map(|s| s.normalized).collect(),
            statistics: SummaryStatistics::of(&raw),
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
