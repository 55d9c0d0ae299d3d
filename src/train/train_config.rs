use serde::{Deserialize, Serialize};

/// Hyperparameters for a `Trainer` run.
///
/// # Fields
/// - `learning_rate`           — Adam step size
/// - `batch_size`              — sequences per optimizer step
/// - `epochs`                  — hard cap on full passes over the training set
/// - `early_stopping_patience` — non-improving epochs tolerated before halting
/// - `grad_clip`               — global gradient-norm ceiling; `None` disables clipping
/// - `seed`                    — seed for the per-epoch batch shuffle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub early_stopping_patience: usize,
    pub grad_clip: Option<f64>,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            learning_rate: 0.001,
            batch_size: 32,
            epochs: 100,
            early_stopping_patience: 10,
            grad_clip: Some(5.0),
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".into());
        }
        if self.epochs == 0 {
            return Err("epochs must be at least 1".into());
        }
        if !(self.learning_rate >= 0.0) || !self.learning_rate.is_finite() {
            return Err("learning_rate must be a finite, non-negative number".into());
        }
        if matches!(self.grad_clip, Some(c) if !(c > 0.0)) {
            return Err("grad_clip must be positive".into());
        }
        Ok(())
    }
}
