use serde::{Deserialize, Serialize};

use crate::session::sample::Sample;

/// Above this current (amperes) a sample is a critical over-current.
pub const CRITICAL_CURRENT: f64 = 0.01;
/// Acceptable insulation resistance range in ohms, inclusive.
pub const RESISTANCE_RANGE: (f64, f64) = (1e3, 1e12);

/// Per-sample verdict. Declaration order matches the classifier head outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Valid,
    Error,
    OutOfRange,
    Critical,
    Dead,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Valid,
        Classification::Error,
        Classification::OutOfRange,
        Classification::Critical,
        Classification::Dead,
    ];

    /// Every label except `Valid`.
    pub const DEFECTS: [Classification; 4] = [
        Classification::Error,
        Classification::OutOfRange,
        Classification::Critical,
        Classification::Dead,
    ];

    /// Classifies one sample from its raw voltage, current and resistance.
    ///
    /// The conditions overlap, so they are checked in a fixed priority:
    /// Dead, Critical, OutOfRange, Error, then Valid.
    pub fn classify(sample: &Sample) -> Classification {
        if sample.voltage == 0.0 && sample.current == 0.0 {
            return Classification::Dead;
        }
        if sample.current > CRITICAL_CURRENT {
            return Classification::Critical;
        }
        let (lo, hi) = RESISTANCE_RANGE;
        if sample.resistance < lo || sample.resistance > hi {
            return Classification::OutOfRange;
        }
        if sample.voltage < 0.0 || sample.current < 0.0 || sample.resistance < 0.0 {
            return Classification::Error;
        }
        Classification::Valid
    }

    /// Position in the classifier head's logits.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Classification> {
        Classification::ALL.get(index).copied()
    }
}
