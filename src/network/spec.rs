use serde::{Deserialize, Serialize};

/// Channels fed to the recurrent encoder: normalized time, voltage, current
/// and resistance.
pub const INPUT_DIM: usize = 4;

/// Classifier outputs, one per `Classification` variant.
pub const NUM_CLASSES: usize = 5;

/// Architecture of a `SequenceModel`.
///
/// Saved inside every checkpoint so a loaded model is rebuilt with exactly the
/// shapes its parameters were trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width `H` of every LSTM layer.
    pub hidden_dim: usize,
    /// Number of stacked LSTM layers `L`.
    pub num_layers: usize,
    /// Dimension `D` of the latent embedding.
    pub latent_dim: usize,
    /// Hidden widths of the encoder head, outermost first. The decoder head
    /// mirrors them.
    pub head_widths: Vec<usize>,
    /// Hidden widths of the classifier head.
    pub classifier_widths: Vec<usize>,
    /// Seed for parameter initialization.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_dim: 128,
            num_layers: 3,
            latent_dim: 16,
            head_widths: vec![64, 32],
            classifier_widths: vec![32, 16],
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.hidden_dim == 0 || self.num_layers == 0 || self.latent_dim == 0 {
            return Err("model dimensions must be non-zero".into());
        }
        if self.head_widths.iter().chain(self.classifier_widths.iter()).any(|&w| w == 0) {
            return Err("head widths must be non-zero".into());
        }
        Ok(())
    }
}
