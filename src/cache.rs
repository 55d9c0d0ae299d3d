//! Bounded, time-boxed memo of analysis reports.
//!
//! Keys are blake3 fingerprints of the raw input columns together with the
//! baseline generation the report was computed against.

use std::time::Duration;

use moka::sync::Cache;

use crate::report::Report;
use crate::session::RawSession;

/// Canonical key for `session` scored against baseline `generation`.
pub fn fingerprint(session: &RawSession, generation: u64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&generation.to_le_bytes());
    for column in session.columns() {
        hasher.update(&(column.len() as u64).to_le_bytes());
        for value in column {
            hasher.update(&value.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

pub struct AnalysisCache {
    cache: Cache<String, Report>,
}

impl AnalysisCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(capacity).time_to_live(ttl).build();
        Self { cache }
    }

    pub fn get(&self, key: &str) -> Option<Report> {
        self.cache.get(key)
    }

    pub fn insert(&self, key: String, report: Report) {
        self.cache.insert(key, report);
    }

    /// Drops every entry; called whenever the baseline changes.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{AccuracyMetrics, DefectMetrics};
    use crate::session::ProcessedSession;

    fn report() -> Report {
        Report {
            timestamp: chrono::Utc::now(),
            session_summary: ProcessedSession::default().summary(),
            accuracy_metrics: AccuracyMetrics::combine(1.0, 1.0, 1.0),
            defect_metrics: DefectMetrics::default(),
            recommendations: vec![crate::report::RESULTS_NOMINAL.to_string()],
            plot_artifact_ids: Vec::new(),
            model_diagnostics: None,
        }
    }

    fn session(v: f64) -> RawSession {
        RawSession {
            time: vec![0.0, 1.0],
            voltage: vec![v, v],
            current: vec![0.001, 0.001],
            resistance: vec![1e6, 1e6],
        }
    }

    #[test]
    fn fingerprint_tracks_data_and_generation() {
        let a = fingerprint(&session(1.0), 1);
        assert_eq!(a, fingerprint(&session(1.0), 1));
        assert_ne!(a, fingerprint(&session(1.5), 1));
        assert_ne!(a, fingerprint(&session(1.0), 2));
    }

    #[test]
    fn insert_get_clear() {
        let cache = AnalysisCache::new(8, Duration::from_secs(60));
        let key = fingerprint(&session(1.0), 1);
        cache.insert(key.clone(), report());
        assert!(cache.get(&key).is_some());
        cache.clear();
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn entries_expire() {
        let cache = AnalysisCache::new(8, Duration::from_millis(30));
        cache.insert("k".to_string(), report());
        std::thread::sleep(Duration::from_millis(80));
        assert!(cache.get("k").is_none());
    }
}
