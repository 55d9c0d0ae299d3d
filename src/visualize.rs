//! Seam to the plotting collaborator. The analyzer never looks inside the
//! artifacts it gets back.

use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::session::ProcessedSession;

/// Opaque handle to a rendered plot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

pub trait PlotRenderer: Send + Sync {
    fn render(&self, session: &ProcessedSession, baseline: &Baseline) -> Vec<ArtifactId>;
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlots;

impl PlotRenderer for NoPlots {
    fn render(&self, _session: &ProcessedSession, _baseline: &Baseline) -> Vec<ArtifactId> {
        Vec::new()
    }
}
