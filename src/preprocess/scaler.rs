use serde::{Deserialize, Serialize};

use crate::math::stats;
use crate::session::{Channel, RawSession, Sample};

/// Per-channel z-score scaler over time, voltage, current and resistance.
///
/// Spread is the population standard deviation; a channel with zero spread
/// is scaled by 1 so it maps to zero rather than dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; 4],
    pub scale: [f64; 4],
}

impl StandardScaler {
    pub fn fit(session: &RawSession) -> StandardScaler {
        let mut mean = [0.0; 4];
        let mut scale = [1.0; 4];
        for (k, channel) in Channel::ALL.iter().enumerate() {
            let column = session.column(*channel);
            mean[k] = stats::mean(column).unwrap_or(0.0);
            scale[k] = match stats::population_std(column) {
                Some(s) if s > 0.0 && s.is_finite() => s,
                _ => 1.0,
            };
        }
        StandardScaler { mean, scale }
    }

    pub fn transform(&self, sample: &Sample) -> Sample {
        let z = |k: usize, v: f64| (v - self.mean[k]) / self.scale[k];
        Sample::new(
            z(0, sample.time),
            z(1, sample.voltage),
            z(2, sample.current),
            z(3, sample.resistance),
        )
    }
}
