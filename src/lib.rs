pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;

pub mod analyzer;
pub mod baseline;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod logging;
pub mod preprocess;
pub mod report;
pub mod scoring;
pub mod session;
pub mod synthetic;
pub mod visualize;

// Convenience re-exports
pub use analyzer::{Analyzer, AnalyzerStatistics, TrainingSummary};
pub use baseline::{Baseline, SummaryStatistics};
pub use checkpoint::Checkpoint;
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use network::{ModelConfig, SequenceModel};
pub use preprocess::Preprocessor;
pub use report::Report;
pub use scoring::{AccuracyCalculator, AccuracyMetrics, DefectMetrics};
pub use session::{Classification, RawSession, Sample};
pub use train::{TrainConfig, Trainer};
