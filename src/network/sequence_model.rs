use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::layers::{lstm::LstmLayer, param::Param};
use crate::network::head::Head;
use crate::network::spec::{ModelConfig, INPUT_DIM, NUM_CLASSES};

/// Whether the model is fitting (caches activations) or serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Inference,
}

/// Everything one forward pass produces for a single sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Latent embedding, length `latent_dim`.
    pub embedding: Vec<f64>,
    /// Decoder output, length `hidden_dim`; targets `encoder_output`.
    pub reconstruction: Vec<f64>,
    /// Unnormalized scores over the five classification labels.
    pub class_logits: Vec<f64>,
    /// Final hidden state of the top LSTM layer.
    pub encoder_output: Vec<f64>,
}

/// Loss gradients with respect to each `ModelOutput` field used in training.
#[derive(Debug, Clone)]
pub struct OutputGradients {
    pub reconstruction: Vec<f64>,
    pub class_logits: Vec<f64>,
    pub encoder_output: Vec<f64>,
}

/// Stacked LSTM encoder with an autoencoder pair of heads and a classifier
/// head on the latent embedding.
///
/// The decoder reconstructs the encoder's own final hidden state rather than
/// the raw input sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModel {
    pub config: ModelConfig,
    encoder: Vec<LstmLayer>,
    encoder_head: Head,
    decoder_head: Head,
    classifier: Head,
    mode: Mode,
}

impl SequenceModel {
    /// Builds a freshly initialized model in inference mode. Initialization is
    /// fully determined by `config.seed`.
    pub fn new(config: &ModelConfig) -> SequenceModel {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let h = config.hidden_dim;

        let encoder = (0..config.num_layers)
            .map(|i| LstmLayer::new(if i == 0 { INPUT_DIM } else { h }, h, &mut rng))
            .collect();

        let encoder_head = Head::new(h, &config.head_widths, config.latent_dim, true, &mut rng);
        let mirrored: Vec<usize> = config.head_widths.iter().rev().copied().collect();
        let decoder_head = Head::new(config.latent_dim, &mirrored, h, true, &mut rng);
        let classifier = Head::new(config.latent_dim, &config.classifier_widths, NUM_CLASSES, false, &mut rng);

        SequenceModel {
            config: config.clone(),
            encoder,
            encoder_head,
            decoder_head,
            classifier,
            mode: Mode::Inference,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switching to inference drops any cached activations.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Inference {
            self.clear_cache();
        }
        self.mode = mode;
    }

    /// Runs every sequence of the batch. Each sequence is `T` rows of
    /// `INPUT_DIM` channels.
    pub fn forward(&self, batch: &[Vec<Vec<f64>>]) -> Vec<ModelOutput> {
        batch.iter().map(|seq| self.forward_one(seq)).collect()
    }

    pub fn forward_one(&self, sequence: &[Vec<f64>]) -> ModelOutput {
        let mut current = sequence.to_vec();
        for layer in &self.encoder {
            current = layer.forward(&current);
        }
        let encoder_output = current.pop().unwrap_or_else(|| vec![0.0; self.config.hidden_dim]);

        let embedding = self.encoder_head.forward(&encoder_output);
        let reconstruction = self.decoder_head.forward(&embedding);
        let class_logits = self.classifier.forward(&embedding);

        ModelOutput { embedding, reconstruction, class_logits, encoder_output }
    }

    /// Forward pass that caches activations for `backward`.
    /// `sequence` must be non-empty.
    pub(crate) fn forward_train(&mut self, sequence: &[Vec<f64>]) -> ModelOutput {
        let mut current = sequence.to_vec();
        for layer in &mut self.encoder {
            current = layer.forward_train(&current);
        }
        let encoder_output = current.pop().unwrap_or_else(|| vec![0.0; self.config.hidden_dim]);

        let embedding = self.encoder_head.forward_train(&encoder_output);
        let reconstruction = self.decoder_head.forward_train(&embedding);
        let class_logits = self.classifier.forward_train(&embedding);

        ModelOutput { embedding, reconstruction, class_logits, encoder_output }
    }

    /// Backpropagates the gradients of the last `forward_train` call,
    /// accumulating into every parameter's gradient buffer.
    pub(crate) fn backward(&mut self, grads: &OutputGradients) {
        let mut d_embedding = self.decoder_head.backward(&grads.reconstruction);
        let d_from_classifier = self.classifier.backward(&grads.class_logits);
        for (d, c) in d_embedding.iter_mut().zip(d_from_classifier.iter()) {
            *d += c;
        }

        let mut d_hidden = self.encoder_head.backward(&d_embedding);
        for (d, e) in d_hidden.iter_mut().zip(grads.encoder_output.iter()) {
            *d += e;
        }

        let steps = self.encoder.first().map_or(0, LstmLayer::cached_steps);
        if steps == 0 {
            return;
        }
        let mut grad_seq = vec![vec![0.0; self.config.hidden_dim]; steps];
        grad_seq[steps - 1] = d_hidden;
        for layer in self.encoder.iter_mut().rev() {
            grad_seq = layer.backward(&grad_seq);
        }
    }

    pub(crate) fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params: Vec<&mut Param> = Vec::new();
        for layer in &mut self.encoder {
            params.extend(layer.params_mut());
        }
        params.extend(self.encoder_head.params_mut());
        params.extend(self.decoder_head.params_mut());
        params.extend(self.classifier.params_mut());
        params
    }

    pub(crate) fn zero_grad(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }

    pub fn parameter_count(&mut self) -> usize {
        self.params_mut().iter().map(|p| p.len()).sum()
    }

    pub(crate) fn clear_cache(&mut self) {
        for layer in &mut self.encoder {
            layer.clear_cache();
        }
        self.encoder_head.clear_cache();
        self.decoder_head.clear_cache();
        self.classifier.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::{cross_entropy::CrossEntropyLoss, mse::MseLoss};

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            hidden_dim: 5,
            num_layers: 2,
            latent_dim: 3,
            head_widths: vec![4],
            classifier_widths: vec![4],
            seed: 9,
        }
    }

    fn sequence() -> Vec<Vec<f64>> {
        (0..6)
            .map(|t| {
                let t = t as f64;
                vec![t / 6.0, (t * 0.7).sin(), (t * 0.3).cos(), 0.1 * t - 0.2]
            })
            .collect()
    }

    // Training objective for a single sequence: MSE(recon, h) + 0.1·CE(logits, 0)
    fn objective(model: &SequenceModel, seq: &[Vec<f64>]) -> f64 {
        let out = model.forward_one(seq);
        MseLoss::loss(&out.reconstruction, &out.encoder_output)
            + 0.1 * CrossEntropyLoss::loss(&out.class_logits, 0)
    }

    #[test]
    fn output_shapes_follow_config() {
        let model = SequenceModel::new(&tiny_config());
        let outs = model.forward(&[sequence(), sequence()]);
        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0].embedding.len(), 3);
        assert_eq!(outs[0].reconstruction.len(), 5);
        assert_eq!(outs[0].encoder_output.len(), 5);
        assert_eq!(outs[0].class_logits.len(), NUM_CLASSES);
        assert_eq!(outs[0], outs[1]);
    }

    #[test]
    fn same_seed_same_model() {
        let a = SequenceModel::new(&tiny_config()).forward_one(&sequence());
        let b = SequenceModel::new(&tiny_config()).forward_one(&sequence());
        assert_eq!(a, b);
    }

    #[test]
    fn full_backward_matches_finite_difference() {
        let seq = sequence();
        let mut model = SequenceModel::new(&tiny_config());
        model.set_mode(Mode::Train);

        let out = model.forward_train(&seq);
        let d_recon = MseLoss::derivative(&out.reconstruction, &out.encoder_output);
        let grads = OutputGradients {
            encoder_output: d_recon.iter().map(|g| -g).collect(),
            reconstruction: d_recon,
            class_logits: CrossEntropyLoss::derivative(&out.class_logits, 0)
                .into_iter()
                .map(|g| 0.1 * g)
                .collect(),
        };
        model.backward(&grads);

        let eps = 1e-6;
        let n_params = model.params_mut().len();
        for idx in [0, 1, 3, n_params / 2, n_params - 1] {
            let (analytic, probe_plus, probe_minus) = {
                let mut plus = model.clone();
                let mut minus = model.clone();
                let analytic = {
                    let mut params = model.params_mut();
                    params[idx].grad_mut().data[0][0]
                };
                plus.params_mut()[idx].value.data[0][0] += eps;
                minus.params_mut()[idx].value.data[0][0] -= eps;
                (analytic, plus, minus)
            };
            let numeric = (objective(&probe_plus, &seq) - objective(&probe_minus, &seq)) / (2.0 * eps);
            assert!(
                (numeric - analytic).abs() < 1e-5 * (1.0 + numeric.abs()),
                "param {idx}: numeric {numeric} analytic {analytic}"
            );
        }
    }

    #[test]
    fn inference_mode_clears_caches() {
        let mut model = SequenceModel::new(&tiny_config());
        model.set_mode(Mode::Train);
        model.forward_train(&sequence());
        assert_eq!(model.encoder[0].cached_steps(), 6);
        model.set_mode(Mode::Inference);
        assert_eq!(model.encoder[0].cached_steps(), 0);
        assert_eq!(model.mode(), Mode::Inference);
    }
}
