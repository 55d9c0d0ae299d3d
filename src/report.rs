use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{AccuracyMetrics, DefectMetrics};
use crate::session::{Classification, SessionSummary};
use crate::visualize::ArtifactId;

pub const REVIEW_TEST_CONDITIONS: &str = "review test conditions";
pub const INSPECT_PRODUCT_QUALITY: &str = "inspect product quality";
pub const CHECK_MEASUREMENT_STABILITY: &str = "check measurement stability";
pub const HALT_PRODUCTION: &str = "halt production, investigate cause";
pub const RESULTS_NOMINAL: &str = "results nominal";

/// What the active model makes of the session. Informational only; it does
/// not feed the recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    /// MSE between the decoder output and the encoder's final hidden state.
    pub reconstruction_error: f64,
    pub predicted_class: Classification,
    /// Softmax probability of `predicted_class`.
    pub class_confidence: f64,
    pub exceeds_reconstruction_threshold: bool,
}

/// Outcome of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub session_summary: SessionSummary,
    pub accuracy_metrics: AccuracyMetrics,
    pub defect_metrics: DefectMetrics,
    pub recommendations: Vec<String>,
    pub plot_artifact_ids: Vec<ArtifactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_diagnostics: Option<ModelDiagnostics>,
}

/// Every rule that fires, in order; `RESULTS_NOMINAL` when none does.
pub fn recommendations(accuracy: &AccuracyMetrics, defects: &DefectMetrics) -> Vec<String> {
    let rules = [
        (accuracy.overall_accuracy < 0.7, REVIEW_TEST_CONDITIONS),
        (defects.overall_defect_rate > 10.0, INSPECT_PRODUCT_QUALITY),
        (accuracy.temporal_consistency < 0.6, CHECK_MEASUREMENT_STABILITY),
        (defects.rate(Classification::Critical) > 5.0, HALT_PRODUCTION),
    ];
    let mut out: Vec<String> = rules
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, text)| text.to_string())
        .collect();
    if out.is_empty() {
        out.push(RESULTS_NOMINAL.to_string());
    }
    out
}
