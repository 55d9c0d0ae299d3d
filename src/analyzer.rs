//! The analyzer handle: owns the active model and baseline and sequences
//! preprocessing, training, scoring and report assembly.
//!
//! The active state lives behind one `Arc` that is replaced wholesale on
//! every commit, so a scoring call sees either the previous or the new
//! model/baseline pair and never a mix. Retraining and checkpoint imports
//! serialize on a dedicated mutex.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::baseline::{Baseline, SummaryStatistics};
use crate::cache::{self, AnalysisCache};
use crate::checkpoint::{Checkpoint, FORMAT_VERSION};
use crate::config::{AnalyzerConfig, Thresholds};
use crate::error::{AnalyzerError, Result};
use crate::loss::{CrossEntropyLoss, MseLoss};
use crate::network::resample;
use crate::network::spec::ModelConfig;
use crate::network::SequenceModel;
use crate::preprocess::Preprocessor;
use crate::report::{self, ModelDiagnostics, Report};
use crate::scoring::{calculate_defect_rate, AccuracyCalculator};
use crate::session::{Classification, ProcessedSession, RawSession, Sample};
use crate::train::{TrainOutcome, Trainer};
use crate::visualize::{NoPlots, PlotRenderer};

/// The model/baseline pair that scoring runs against, with everything needed
/// to reproduce it.
#[derive(Debug)]
struct ActiveModel {
    model: SequenceModel,
    baseline: Baseline,
    preprocessor: Arc<Preprocessor>,
    thresholds: Thresholds,
    sequence_len: usize,
    final_loss: Option<f64>,
    generation: u64,
}

/// Result of a successful `Analyzer::train` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    #[serde(flatten)]
    pub outcome: TrainOutcome,
    /// Sessions handed to the trainer.
    pub sessions: usize,
    /// Samples in the new baseline.
    pub baseline_samples: usize,
    /// Generation number of the committed baseline.
    pub generation: u64,
}

/// Read-only view of the analyzer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerStatistics {
    pub initialized: bool,
    pub generation: Option<u64>,
    pub model_config: ModelConfig,
    pub thresholds: Thresholds,
    pub sequence_len: Option<usize>,
    pub final_loss: Option<f64>,
    pub baseline_samples: Option<usize>,
    pub baseline_statistics: Option<SummaryStatistics>,
}

struct Inner {
    config: AnalyzerConfig,
    /// Preprocessor that the next training run uses.
    preprocessor: RwLock<Arc<Preprocessor>>,
    active: RwLock<Option<Arc<ActiveModel>>>,
    train_lock: Mutex<()>,
    cache: AnalysisCache,
    renderer: Arc<dyn PlotRenderer>,
    generation: AtomicU64,
}

/// Cheap-to-clone handle; clones share the same state.
#[derive(Clone)]
pub struct Analyzer {
    inner: Arc<Inner>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Analyzer> {
        Analyzer::with_renderer(config, Arc::new(NoPlots))
    }

    pub fn with_renderer(config: AnalyzerConfig, renderer: Arc<dyn PlotRenderer>) -> Result<Analyzer> {
        config.validate()?;
        let cache = AnalysisCache::new(
            config.analysis.cache_capacity as u64,
            std::time::Duration::from_secs(config.analysis.cache_ttl_secs),
        );
        let preprocessor = Preprocessor::new(config.preprocessing.clone());
        Ok(Analyzer {
            inner: Arc::new(Inner {
                config,
                preprocessor: RwLock::new(Arc::new(preprocessor)),
                active: RwLock::new(None),
                train_lock: Mutex::new(()),
                cache,
                renderer,
                generation: AtomicU64::new(0),
            }),
        })
    }

    /// An analyzer restored from a checkpoint file.
    pub fn from_checkpoint(config: AnalyzerConfig, path: &Path) -> Result<Analyzer> {
        let analyzer = Analyzer::new(config)?;
        analyzer.load_checkpoint(path)?;
        Ok(analyzer)
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.inner.config
    }

    pub fn is_initialized(&self) -> bool {
        self.active().is_ok()
    }

    fn active(&self) -> Result<Arc<ActiveModel>> {
        self.inner
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AnalyzerError::NotInitialized("model and baseline"))
    }

    fn commit(&self, next: Option<ActiveModel>) {
        let next = next.map(Arc::new);
        *self.inner.active.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.inner.cache.clear();
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    /// Preprocesses `sessions`, trains on them and adopts the result.
    ///
    /// Training continues from the active model when there is one. The new
    /// baseline comes from the first session that still has samples after
    /// preprocessing. On any failure the previous model and baseline stay
    /// active.
    pub fn train(&self, sessions: &[RawSession]) -> Result<TrainingSummary> {
        let _guard = self.inner.train_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let config = &self.inner.config;
        info!(sessions = sessions.len(), "training requested");

        let preprocessor = self.inner.preprocessor.read().unwrap_or_else(PoisonError::into_inner).clone();
        let processed = sessions
            .iter()
            .map(|s| preprocessor.preprocess(s))
            .collect::<Result<Vec<ProcessedSession>>>()?;
        let baseline = processed
            .iter()
            .find_map(Baseline::from_session)
            .ok_or(AnalyzerError::EmptyTrainingSet)?;

        let mut model = match self.active() {
            Ok(active) => active.model.clone(),
            Err(_) => SequenceModel::new(&config.model),
        };
        let trainer = Trainer::new(config.training.clone(), config.analysis.max_sequence_len);
        let outcome = trainer.train(&mut model, &processed)?;

        let generation = self.next_generation();
        let next = ActiveModel {
            model,
            baseline,
            preprocessor,
            thresholds: config.thresholds.clone(),
            sequence_len: outcome.sequence_len,
            final_loss: Some(outcome.final_loss),
            generation,
        };
        if let Some(path) = &config.analysis.checkpoint_path {
            checkpoint_of(&next)?.save_json(path)?;
            info!(path = %path.display(), "checkpoint saved");
        }

        let summary = TrainingSummary {
            outcome,
            sessions: sessions.len(),
            baseline_samples: next.baseline.len(),
            generation,
        };
        self.commit(Some(next));
        info!(generation, final_loss = summary.outcome.final_loss, "baseline committed");
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Scores `session` against the active baseline within the configured
    /// deadline.
    ///
    /// The work runs on its own thread against a snapshot of the active
    /// state; on timeout the result is discarded and nothing shared changes.
    /// A timed-out worker is not killed: it stops at the next stage boundary
    /// of the pipeline, so a long preprocessing stage still runs to its end.
    pub fn analyze(&self, session: &RawSession) -> Result<Report> {
        session.validate()?;
        let active = self.active()?;

        let key = cache::fingerprint(session, active.generation);
        if let Some(report) = self.inner.cache.get(&key) {
            debug!(generation = active.generation, "analysis cache hit");
            return Ok(report);
        }

        let timeout_ms = self.inner.config.analysis.timeout_ms;
        let cancel = Arc::new(Cancellation::new(timeout_ms));
        let (tx, rx) = mpsc::channel();
        let worker_session = session.clone();
        let worker_active = Arc::clone(&active);
        let worker_cancel = Arc::clone(&cancel);
        let renderer = Arc::clone(&self.inner.renderer);
        std::thread::Builder::new()
            .name("hipot-analyze".into())
            .spawn(move || {
                let result = build_report(&worker_session, &worker_active, renderer.as_ref(), &worker_cancel);
                let _ = tx.send(result);
            })
            .map_err(|e| AnalyzerError::Worker(e.to_string()))?;

        let report = match rx.recv_timeout(self.inner.config.analysis.timeout()) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(timeout_ms, "analysis timed out");
                return Err(AnalyzerError::Timeout { timeout_ms });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(AnalyzerError::Worker("worker exited without a result".into()));
            }
        };

        self.inner.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Rule-based label of a single sample. Needs no model.
    pub fn classify_sample(&self, sample: &Sample) -> Classification {
        Classification::classify(sample)
    }

    pub fn statistics(&self) -> AnalyzerStatistics {
        let active = self.active().ok();
        AnalyzerStatistics {
            initialized: active.is_some(),
            generation: active.as_ref().map(|a| a.generation),
            model_config: active
                .as_ref()
                .map_or_else(|| self.inner.config.model.clone(), |a| a.model.config.clone()),
            thresholds: active
                .as_ref()
                .map_or_else(|| self.inner.config.thresholds.clone(), |a| a.thresholds.clone()),
            sequence_len: active.as_ref().map(|a| a.sequence_len),
            final_loss: active.as_ref().and_then(|a| a.final_loss),
            baseline_samples: active.as_ref().map(|a| a.baseline.len()),
            baseline_statistics: active.as_ref().map(|a| a.baseline.statistics),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn export_checkpoint(&self) -> Result<Checkpoint> {
        let active = self.active()?;
        checkpoint_of(&active)
    }

    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        self.export_checkpoint()?.save_json(path)?;
        info!(path = %path.display(), "checkpoint saved");
        Ok(())
    }

    /// Replaces the model, baseline and preprocessor state with the
    /// checkpoint's, as one commit.
    pub fn import_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        checkpoint.model.config.validate().map_err(AnalyzerError::Config)?;
        let _guard = self.inner.train_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let preprocessor = Arc::new(Preprocessor::from_fitted(
            self.inner.config.preprocessing.clone(),
            checkpoint.preprocessor,
        ));
        let generation = self.next_generation();
        let next = ActiveModel {
            model: checkpoint.model,
            baseline: checkpoint.baseline,
            preprocessor: Arc::clone(&preprocessor),
            thresholds: checkpoint.thresholds,
            sequence_len: checkpoint.sequence_len,
            final_loss: checkpoint.final_loss,
            generation,
        };
        *self.inner.preprocessor.write().unwrap_or_else(PoisonError::into_inner) = preprocessor;
        self.commit(Some(next));
        info!(generation, "checkpoint loaded");
        Ok(())
    }

    pub fn load_checkpoint(&self, path: &Path) -> Result<()> {
        self.import_checkpoint(Checkpoint::load_json(path)?)
    }

    /// Drops the active model and baseline and empties the cache. Later
    /// scoring calls fail with `NotInitialized` until the next train or load.
    pub fn shutdown(&self) {
        let _guard = self.inner.train_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit(None);
        info!("analyzer shut down");
    }
}

fn checkpoint_of(active: &ActiveModel) -> Result<Checkpoint> {
    let preprocessor = active
        .preprocessor
        .fit_state()
        .cloned()
        .ok_or(AnalyzerError::NotInitialized("preprocessor"))?;
    Ok(Checkpoint {
        format_version: FORMAT_VERSION,
        saved_at: Utc::now(),
        sequence_len: active.sequence_len,
        final_loss: active.final_loss,
        thresholds: active.thresholds.clone(),
        model: active.model.clone(),
        baseline: active.baseline.clone(),
        preprocessor,
    })
}

/// Set once the caller of `analyze` has stopped waiting.
struct Cancellation {
    cancelled: AtomicBool,
    timeout_ms: u64,
}

impl Cancellation {
    fn new(timeout_ms: u64) -> Cancellation {
        Cancellation { cancelled: AtomicBool::new(false), timeout_ms }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(AnalyzerError::Timeout { timeout_ms: self.timeout_ms });
        }
        Ok(())
    }
}

/// preprocess -> accuracy -> defects -> plots -> recommendations, giving up
/// between stages once `cancel` is set.
fn build_report(
    session: &RawSession,
    active: &ActiveModel,
    renderer: &dyn PlotRenderer,
    cancel: &Cancellation,
) -> Result<Report> {
    cancel.check()?;
    let processed = active.preprocessor.preprocess(session)?;
    cancel.check()?;
    let accuracy_metrics = AccuracyCalculator::new(Some(&active.baseline)).calculate_accuracy(&processed)?;
    let defect_metrics = calculate_defect_rate(&processed.raw_samples());
    cancel.check()?;
    let plot_artifact_ids = renderer.render(&processed, &active.baseline);
    cancel.check()?;
    let recommendations = report::recommendations(&accuracy_metrics, &defect_metrics);

    Ok(Report {
        timestamp: Utc::now(),
        session_summary: processed.summary(),
        accuracy_metrics,
        defect_metrics,
        recommendations,
        plot_artifact_ids,
        model_diagnostics: diagnose(active, &processed),
    })
}

fn diagnose(active: &ActiveModel, processed: &ProcessedSession) -> Option<ModelDiagnostics> {
    if processed.is_empty() {
        return None;
    }
    let sequence = resample::to_fixed_length(&processed.normalized_sequence(), active.sequence_len);
    let out = active.model.forward_one(&sequence);

    let reconstruction_error = MseLoss::loss(&out.reconstruction, &out.encoder_output);
    let probabilities = CrossEntropyLoss::softmax(&out.class_logits);
    let (index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    Some(ModelDiagnostics {
        reconstruction_error,
        predicted_class: Classification::from_index(index)?,
        class_confidence: confidence,
        exceeds_reconstruction_threshold: reconstruction_error > active.thresholds.reconstruction_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;
    use crate::visualize::ArtifactId;

    fn small_config() -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.model = ModelConfig {
            hidden_dim: 6,
            num_layers: 1,
            latent_dim: 3,
            head_widths: vec![4],
            classifier_widths: vec![4],
            seed: 42,
        };
        config.training.epochs = 3;
        config.analysis.max_sequence_len = 40;
        config.preprocessing.n_trees = 20;
        config
    }

    struct CountingRenderer;

    impl PlotRenderer for CountingRenderer {
        fn render(&self, session: &ProcessedSession, _baseline: &Baseline) -> Vec<ArtifactId> {
            vec![ArtifactId(format!("plot-{}", session.len()))]
        }
    }

    #[test]
    fn analyze_before_training_is_not_initialized() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let err = analyzer.analyze(&synthetic::sample_session(1, 50)).unwrap_err();
        assert!(matches!(err, AnalyzerError::NotInitialized(_)));
        assert!(!analyzer.statistics().initialized);
    }

    #[test]
    fn report_carries_plots_and_diagnostics() {
        let analyzer = Analyzer::with_renderer(small_config(), Arc::new(CountingRenderer)).unwrap();
        analyzer.train(&[synthetic::sample_session(1, 60)]).unwrap();

        let report = analyzer.analyze(&synthetic::sample_session(2, 60)).unwrap();
        assert_eq!(report.plot_artifact_ids, vec![ArtifactId(format!("plot-{}", report.session_summary.count))]);
        let diagnostics = report.model_diagnostics.unwrap();
        assert!(diagnostics.class_confidence > 0.0 && diagnostics.class_confidence <= 1.0);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn repeated_analysis_hits_the_cache() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        analyzer.train(&[synthetic::sample_session(1, 60)]).unwrap();
        let session = synthetic::sample_session(2, 60);
        let first = analyzer.analyze(&session).unwrap();
        let second = analyzer.analyze(&session).unwrap();
        // a cached report keeps its original timestamp
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[test]
    fn shutdown_drops_the_baseline() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        analyzer.train(&[synthetic::sample_session(1, 60)]).unwrap();
        assert!(analyzer.is_initialized());
        analyzer.shutdown();
        assert!(!analyzer.is_initialized());
        assert!(matches!(analyzer.export_checkpoint(), Err(AnalyzerError::NotInitialized(_))));
    }

    #[test]
    fn invalid_session_is_rejected_before_lookup() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let bad = RawSession {
            time: vec![0.0],
            voltage: vec![],
            current: vec![0.0],
            resistance: vec![0.0],
        };
        assert!(matches!(analyzer.analyze(&bad), Err(AnalyzerError::Validation(_))));
    }

    struct TallyRenderer(std::sync::atomic::AtomicUsize);

    impl PlotRenderer for TallyRenderer {
        fn render(&self, _session: &ProcessedSession, _baseline: &Baseline) -> Vec<ArtifactId> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    #[test]
    fn cancelled_worker_stops_between_stages() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        analyzer.train(&[synthetic::sample_session(1, 60)]).unwrap();
        let active = analyzer.active().unwrap();
        let session = synthetic::sample_session(2, 60);
        let renderer = TallyRenderer(std::sync::atomic::AtomicUsize::new(0));

        let cancel = Cancellation::new(5);
        cancel.cancel();
        let result = build_report(&session, &active, &renderer, &cancel);
        assert!(matches!(result, Err(AnalyzerError::Timeout { timeout_ms: 5 })));
        assert_eq!(renderer.0.load(Ordering::SeqCst), 0);

        let live = Cancellation::new(5);
        assert!(build_report(&session, &active, &renderer, &live).is_ok());
        assert_eq!(renderer.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exported_checkpoint_matches_active_state() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        analyzer.train(&[synthetic::sample_session(1, 60)]).unwrap();
        let stats = analyzer.statistics();

        let checkpoint = analyzer.export_checkpoint().unwrap();
        assert_eq!(checkpoint.format_version, FORMAT_VERSION);
        assert_eq!(Some(checkpoint.sequence_len), stats.sequence_len);
        assert_eq!(Some(checkpoint.baseline.len()), stats.baseline_samples);
        assert_eq!(checkpoint.final_loss, stats.final_loss);
    }
}
