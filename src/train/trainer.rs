use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalyzerError, Result};
use crate::network::resample;
use crate::network::sequence_model::{Mode, SequenceModel};
use crate::optim::Adam;
use crate::session::ProcessedSession;
use crate::train::early_stopping::{EarlyStopping, Verdict};
use crate::train::loop_fn::{evaluate, run_one_epoch};
use crate::train::train_config::TrainConfig;

/// Result of one `Trainer::train` call.
///
/// # Fields
/// * `final_loss`       - Best epoch loss; the parameters left in the model produce it.
/// * `loss_history`     - Epoch loss of every completed epoch, in order.
/// * `epochs_completed` - Number of epochs run before the cap or early stop.
/// * `best_epoch`       - 1-based epoch whose parameters were kept.
/// * `stopped_early`    - Whether patience ran out before the cap.
/// * `sequence_len`     - Fixed length every sequence was resampled to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub final_loss: f64,
    pub loss_history: Vec<f64>,
    pub epochs_completed: usize,
    pub best_epoch: usize,
    pub stopped_early: bool,
    pub sequence_len: usize,
}

pub struct Trainer {
    config: TrainConfig,
    max_sequence_len: usize,
}

/// Normalized channel sequences of every non-empty session, resampled to a
/// common length. Returns the sequences and that length.
pub fn build_dataset(sessions: &[ProcessedSession], max_sequence_len: usize) -> Result<(Vec<Vec<Vec<f64>>>, usize)> {
    let usable: Vec<&ProcessedSession> = sessions.iter().filter(|s| !s.is_empty()).collect();
    let target = resample::target_length(usable.iter().map(|s| s.len()), max_sequence_len);
    if usable.is_empty() || target == 0 {
        return Err(AnalyzerError::EmptyTrainingSet);
    }
    let dataset = usable
        .iter()
        .map(|s| resample::to_fixed_length(&s.normalized_sequence(), target))
        .collect();
    Ok((dataset, target))
}

impl Trainer {
    pub fn new(config: TrainConfig, max_sequence_len: usize) -> Trainer {
        Trainer { config, max_sequence_len }
    }

    /// Fits `model` on `sessions` in place.
    ///
    /// The parameters of the best epoch are restored before returning and the
    /// model is left in inference mode. Fails with `EmptyTrainingSet` when no
    /// session has a sample left, leaving `model` untouched.
    pub fn train(&self, model: &mut SequenceModel, sessions: &[ProcessedSession]) -> Result<TrainOutcome> {
        self.config.validate().map_err(AnalyzerError::Config)?;
        let (dataset, sequence_len) = build_dataset(sessions, self.max_sequence_len)?;

        info!(
            sequences = dataset.len(),
            sequence_len,
            parameters = model.parameter_count(),
            epochs = self.config.epochs,
            patience = self.config.early_stopping_patience,
            "training started"
        );

        for p in model.params_mut() {
            p.reset_moments();
        }
        model.set_mode(Mode::Train);

        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut stopper = EarlyStopping::new(self.config.early_stopping_patience);
        let mut best: Option<SequenceModel> = None;
        let mut loss_history = Vec::new();
        let mut stopped_early = false;

        for epoch in 1..=self.config.epochs {
            let t_start = Instant::now();
            let train_loss = run_one_epoch(
                model,
                &dataset,
                &mut optimizer,
                self.config.batch_size,
                self.config.grad_clip,
                &mut rng,
            );
            loss_history.push(train_loss);

            let verdict = stopper.observe(train_loss);
            if verdict == Verdict::Improved {
                best = Some(model.clone());
            }

            debug!(
                epoch,
                loss = train_loss,
                best = ?stopper.best_loss(),
                patience_counter = stopper.counter(),
                elapsed_ms = t_start.elapsed().as_millis() as u64,
                "epoch finished"
            );

            if verdict == Verdict::Stop {
                stopped_early = true;
                info!(epoch, best_epoch = ?stopper.best_epoch(), "early stopping");
                break;
            }
        }

        if let Some(best_model) = best {
            *model = best_model;
        }
        model.set_mode(Mode::Inference);

        let epochs_completed = loss_history.len();
        let final_loss = match stopper.best_loss() {
            Some(loss) => loss,
            None => evaluate(model, &dataset),
        };
        let outcome = TrainOutcome {
            final_loss,
            loss_history,
            epochs_completed,
            best_epoch: stopper.best_epoch().unwrap_or(epochs_completed),
            stopped_early,
            sequence_len,
        };
        info!(
            final_loss = outcome.final_loss,
            epochs = outcome.epochs_completed,
            best_epoch = outcome.best_epoch,
            "training finished"
        );
        Ok(outcome)
    }
}
