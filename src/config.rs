//! Analyzer configuration.
//!
//! Loaded from a JSON file whose sections and fields are all optional; any
//! missing value takes the default below.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, PersistenceError, Result};
use crate::network::spec::ModelConfig;
use crate::train::train_config::TrainConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Sessions longer than this route missing-value handling through the worker pool.
    pub parallel_threshold: usize,
    pub worker_threads: usize,
    /// Linear interpolation below this length, nearest-neighbour at or above.
    pub interpolation_linear_below: usize,
    /// Expected outlier fraction for the isolation forest.
    pub contamination: f64,
    pub n_trees: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            parallel_threshold: 10_000,
            worker_threads: 4,
            interpolation_linear_below: 1_000,
            contamination: 0.1,
            n_trees: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deadline for a single `analyze` call.
    pub timeout_ms: u64,
    /// Upper bound on the fixed sequence length fed to the model.
    pub max_sequence_len: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Where a successful training run persists its checkpoint, if anywhere.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            timeout_ms: 30_000,
            max_sequence_len: 1_000,
            cache_ttl_secs: 300,
            cache_capacity: 32,
            checkpoint_path: None,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Thresholds reported next to the model diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub reconstruction_threshold: f64,
    pub classification_confidence: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { reconstruction_threshold: 0.1, classification_confidence: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub model: ModelConfig,
    pub training: TrainConfig,
    pub preprocessing: PreprocessConfig,
    pub analysis: AnalysisConfig,
    pub thresholds: Thresholds,
}

impl AnalyzerConfig {
    /// Reads the configuration at `path`, or the defaults when no path is
    /// given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<AnalyzerConfig> {
        let config = match path {
            Some(p) if p.exists() => {
                let file = File::open(p).map_err(|source| PersistenceError::Io {
                    path: p.to_path_buf(),
                    source,
                })?;
                serde_json::from_reader(BufReader::new(file))
                    .map_err(|e| AnalyzerError::Config(format!("{}: {e}", p.display())))?
            }
            _ => AnalyzerConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate().map_err(AnalyzerError::Config)?;
        self.training.validate().map_err(AnalyzerError::Config)?;

        let pre = &self.preprocessing;
        if !(pre.contamination > 0.0 && pre.contamination <= 0.5) {
            return Err(AnalyzerError::Config("contamination must be in (0, 0.5]".into()));
        }
        if pre.n_trees == 0 || pre.max_samples == 0 || pre.worker_threads == 0 {
            return Err(AnalyzerError::Config(
                "n_trees, max_samples and worker_threads must be non-zero".into(),
            ));
        }
        if self.analysis.max_sequence_len == 0 {
            return Err(AnalyzerError::Config("max_sequence_len must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AnalyzerConfig::load(Some(Path::new("/definitely/not/here.json"))).unwrap();
        assert_eq!(cfg, AnalyzerConfig::default());
        assert_eq!(cfg.training.early_stopping_patience, 10);
        assert_eq!(cfg.preprocessing.parallel_threshold, 10_000);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"model": {{"hidden_dim": 8}}, "training": {{"epochs": 3}}}}"#).unwrap();

        let cfg = AnalyzerConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.model.hidden_dim, 8);
        assert_eq!(cfg.model.num_layers, 3);
        assert_eq!(cfg.training.epochs, 3);
        assert_eq!(cfg.training.batch_size, 32);
    }

    #[test]
    fn rejects_bad_contamination() {
        let mut cfg = AnalyzerConfig::default();
        cfg.preprocessing.contamination = 0.0;
        assert!(matches!(cfg.validate(), Err(AnalyzerError::Config(_))));
    }

    #[test]
    fn rejects_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AnalyzerConfig::load(Some(file.path())),
            Err(AnalyzerError::Config(_))
        ));
    }
}
