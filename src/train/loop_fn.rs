use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::layers::param::clip_grad_norm;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mse::MseLoss;
use crate::network::sequence_model::{OutputGradients, SequenceModel};
use crate::optim::Adam;
use crate::session::Classification;

/// Weight of the classification term in the training objective.
pub const CLASSIFICATION_WEIGHT: f64 = 0.1;

/// Classification target for every training sequence. The pipeline carries
/// no ground-truth labels, so all sequences are taught the `Valid` class.
pub const PLACEHOLDER_TARGET: Classification = Classification::Valid;

// ---------------------------------------------------------------------------
// One epoch
// ---------------------------------------------------------------------------

/// Runs one shuffled pass of mini-batch Adam over `dataset` and returns the
/// mean of the batch losses.
pub(crate) fn run_one_epoch(
    model: &mut SequenceModel,
    dataset: &[Vec<Vec<f64>>],
    optimizer: &mut Adam,
    batch_size: usize,
    grad_clip: Option<f64>,
    rng: &mut StdRng,
) -> f64 {
    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    indices.shuffle(rng);

    let mut batch_losses = Vec::with_capacity(dataset.len().div_ceil(batch_size));
    for batch in indices.chunks(batch_size) {
        model.zero_grad();
        let scale = 1.0 / batch.len() as f64;

        // Caches hold one sequence at a time, so each sample runs its own
        // forward/backward and gradients accumulate on the parameters.
        let loss: f64 = batch.iter().map(|&idx| sample_step(model, &dataset[idx], scale)).sum();
        batch_losses.push(loss * scale);

        let mut params = model.params_mut();
        if let Some(max_norm) = grad_clip {
            clip_grad_norm(&mut params, max_norm);
        }
        optimizer.step(&mut params);
    }
    model.clear_cache();

    batch_losses.iter().sum::<f64>() / batch_losses.len().max(1) as f64
}

/// Forward and backward for one sequence, gradients scaled by `scale`.
/// Returns the unscaled loss.
///
/// Objective: `MSE(reconstruction, encoder_output) + 0.1 * CE(logits, target)`.
/// The reconstruction target is itself a model output, so gradient flows
/// into the encoder from both sides of the MSE.
fn sample_step(model: &mut SequenceModel, sequence: &[Vec<f64>], scale: f64) -> f64 {
    let out = model.forward_train(sequence);
    let target = PLACEHOLDER_TARGET.index();

    let reconstruction_loss = MseLoss::loss(&out.reconstruction, &out.encoder_output);
    let classification_loss = CrossEntropyLoss::loss(&out.class_logits, target);

    let d_recon: Vec<f64> = MseLoss::derivative(&out.reconstruction, &out.encoder_output)
        .into_iter()
        .map(|g| g * scale)
        .collect();
    let grads = OutputGradients {
        encoder_output: d_recon.iter().map(|g| -g).collect(),
        reconstruction: d_recon,
        class_logits: CrossEntropyLoss::derivative(&out.class_logits, target)
            .into_iter()
            .map(|g| g * CLASSIFICATION_WEIGHT * scale)
            .collect(),
    };
    model.backward(&grads);

    reconstruction_loss + CLASSIFICATION_WEIGHT * classification_loss
}

/// Objective of `model` on `dataset` without touching parameters.
pub(crate) fn evaluate(model: &SequenceModel, dataset: &[Vec<Vec<f64>>]) -> f64 {
    if dataset.is_empty() {
        return 0.0;
    }
    let target = PLACEHOLDER_TARGET.index();
    let total: f64 = dataset
        .iter()
        .map(|seq| {
            let out = model.forward_one(seq);
            MseLoss::loss(&out.reconstruction, &out.encoder_output)
                + CLASSIFICATION_WEIGHT * CrossEntropyLoss::loss(&out.class_logits, target)
        })
        .sum();
    total / dataset.len() as f64
}
