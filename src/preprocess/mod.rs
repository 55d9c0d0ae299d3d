//! Session preprocessing: missing values, outlier removal, normalization and
//! temporal features, in that order.
//!
//! The fitted state (scaler and outlier detector) is computed once, either
//! explicitly or from the first session preprocessed, and shared by every
//! later call.

pub mod isolation_forest;
pub mod missing;
pub mod scaler;
pub mod strategy;
pub mod temporal;

use std::sync::OnceLock;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PreprocessConfig;
use crate::error::{AnalyzerError, Result};
use crate::session::{ProcessedSession, RawSession};

pub use isolation_forest::IsolationForest;
pub use scaler::StandardScaler;
pub use strategy::Strategy;

/// Statistics learned from a reference session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitState {
    pub scaler: StandardScaler,
    pub outliers: IsolationForest,
}

impl FitState {
    /// Fits on `reference` after filling its missing values. The session must
    /// already be validated.
    pub fn fit(reference: &RawSession, config: &PreprocessConfig) -> FitState {
        let mut clean = reference.clone();
        missing::fill_missing(&mut clean, config.interpolation_linear_below);

        let scaler = StandardScaler::fit(&clean);
        let outliers = IsolationForest::fit(
            &electrical_rows(&clean),
            config.n_trees,
            config.max_samples,
            config.contamination,
            config.seed,
        );
        info!(samples = clean.len(), threshold = outliers.threshold, "preprocessor fitted");
        FitState { scaler, outliers }
    }
}

fn electrical_rows(session: &RawSession) -> Vec<[f64; isolation_forest::FEATURES]> {
    (0..session.len())
        .map(|i| [session.voltage[i], session.current[i], session.resistance[i]])
        .collect()
}

pub struct Preprocessor {
    config: PreprocessConfig,
    fitted: OnceLock<FitState>,
    pool: OnceLock<Option<ThreadPool>>,
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("config", &self.config)
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Preprocessor {
        Preprocessor {
            config,
            fitted: OnceLock::new(),
            pool: OnceLock::new(),
        }
    }

    /// A preprocessor that starts out with a previously fitted state.
    pub fn from_fitted(config: PreprocessConfig, state: FitState) -> Preprocessor {
        let fitted = OnceLock::new();
        let _ = fitted.set(state);
        Preprocessor {
            config,
            fitted,
            pool: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn fit_state(&self) -> Option<&FitState> {
        self.fitted.get()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.get().is_some()
    }

    /// Fits on `reference` unless already fitted. Concurrent callers block
    /// until the first fit finishes and then share its result.
    pub fn fit(&self, reference: &RawSession) -> Result<&FitState> {
        reference.validate()?;
        Ok(self.fitted.get_or_init(|| FitState::fit(reference, &self.config)))
    }

    /// Runs the full pipeline, choosing the execution path by session length.
    pub fn preprocess(&self, session: &RawSession) -> Result<ProcessedSession> {
        let strategy = strategy::select(session.len(), self.config.parallel_threshold);
        self.preprocess_with(session, strategy)
    }

    /// Runs the full pipeline on an explicit execution path.
    pub fn preprocess_with(&self, session: &RawSession, strategy: Strategy) -> Result<ProcessedSession> {
        let state = self.fit(session)?;

        let mut data = session.clone();
        let pool = match strategy {
            Strategy::Parallel => self.pool(),
            Strategy::Sequential => None,
        };
        match pool {
            Some(pool) => missing::fill_missing_parallel(&mut data, self.config.interpolation_linear_below, pool),
            None => missing::fill_missing(&mut data, self.config.interpolation_linear_below),
        }
        if data.has_missing() {
            return Err(AnalyzerError::Validation("missing values remain after interpolation".into()));
        }

        let keep: Vec<bool> = electrical_rows(&data)
            .iter()
            .map(|row| !state.outliers.is_outlier(row))
            .collect();
        data.retain_rows(&keep);

        let rows = (0..data.len())
            .map(|i| {
                let raw = data.sample(i);
                (raw, state.scaler.transform(&raw))
            })
            .collect();
        let samples = temporal::attach(rows);

        debug!(
            input = session.len(),
            kept = samples.len(),
            ?strategy,
            "session preprocessed"
        );
        Ok(ProcessedSession { samples })
    }

    /// The worker pool, built on first use. `None` if it could not be built,
    /// in which case the sequential path is used.
    fn pool(&self) -> Option<&ThreadPool> {
        self.pool
            .get_or_init(|| {
                match ThreadPoolBuilder::new()
                    .num_threads(self.config.worker_threads)
                    .thread_name(|i| format!("hipot-preprocess-{i}"))
                    .build()
                {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        warn!(error = %e, "worker pool unavailable, preprocessing sequentially");
                        None
                    }
                }
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    fn config() -> PreprocessConfig {
        PreprocessConfig {
            n_trees: 25,
            ..PreprocessConfig::default()
        }
    }

    fn with_gaps(mut session: RawSession) -> RawSession {
        let n = session.len();
        for i in (7..n).step_by(97) {
            session.voltage[i] = f64::NAN;
            session.current[(i + 3) % n] = f64::NAN;
        }
        session
    }

    #[test]
    fn never_grows_a_session() {
        let pre = Preprocessor::new(config());
        let session = synthetic::sample_session(1, 400);
        let out = pre.preprocess(&session).unwrap();
        assert!(out.len() <= session.len());
        assert!(!out.is_empty());
    }

    #[test]
    fn paths_agree_across_the_threshold() {
        let session = with_gaps(synthetic::sample_session(3, 10_050));
        let pre = Preprocessor::new(config());
        assert_eq!(strategy::select(session.len(), pre.config().parallel_threshold), Strategy::Parallel);

        let parallel = pre.preprocess_with(&session, Strategy::Parallel).unwrap();
        let sequential = pre.preprocess_with(&session, Strategy::Sequential).unwrap();
        assert_eq!(parallel, sequential);
        assert!(parallel.len() <= session.len());
    }

    #[test]
    fn fits_once_and_reuses_state() {
        let pre = Preprocessor::new(config());
        let first = synthetic::sample_session(1, 200);
        let second = synthetic::sample_session(2, 300);
        pre.preprocess(&first).unwrap();
        let fitted = pre.fit_state().cloned();
        pre.preprocess(&second).unwrap();
        assert_eq!(pre.fit_state().cloned(), fitted);
    }

    #[test]
    fn concurrent_first_calls_share_one_fit() {
        let pre = Preprocessor::new(config());
        let sessions: Vec<RawSession> = (0..4).map(|s| synthetic::sample_session(s, 150)).collect();
        std::thread::scope(|scope| {
            for s in &sessions {
                let pre = &pre;
                scope.spawn(move || pre.preprocess(s).unwrap());
            }
        });
        let state = pre.fit_state().cloned().unwrap();
        let again = pre.fit(&sessions[0]).unwrap();
        assert_eq!(*again, state);
    }

    #[test]
    fn normalized_columns_are_kept_beside_raw() {
        let pre = Preprocessor::new(config());
        let session = synthetic::sample_session(5, 100);
        let out = pre.preprocess(&session).unwrap();
        let state = pre.fit_state().unwrap();
        let first = out.samples[0];
        assert_eq!(first.normalized, state.scaler.transform(&first.raw));
        assert!(out.samples.iter().all(|s| s.rolling_mean.is_some()));
    }

    #[test]
    fn rejects_invalid_sessions() {
        let pre = Preprocessor::new(config());
        let bad = RawSession {
            time: vec![0.0, 1.0],
            voltage: vec![1.0],
            current: vec![0.0, 0.0],
            resistance: vec![1.0, 1.0],
        };
        assert!(matches!(pre.preprocess(&bad), Err(AnalyzerError::Validation(_))));
        assert!(!pre.is_fitted());
    }
}
