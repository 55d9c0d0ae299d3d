//! Accuracy of a session against the active baseline.
//!
//! Three sub-scores in [0, 1] are blended into one. A sub-score that hits a
//! numeric dead end falls back to `NEUTRAL_SCORE` instead of failing the call.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::baseline::{Baseline, SummaryStatistics};
use crate::error::{AnalyzerError, ComputationError, Result};
use crate::math::stats;
use crate::session::{Channel, Electrical, ProcessedSession};

pub const PATTERN_WEIGHT: f64 = 0.4;
pub const STATISTICAL_WEIGHT: f64 = 0.3;
pub const TEMPORAL_WEIGHT: f64 = 0.3;
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Differences larger than this many standard deviations count as jumps.
const JUMP_SIGMAS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub pattern_similarity: f64,
    pub statistical_match: f64,
    pub temporal_consistency: f64,
    pub overall_accuracy: f64,
}

impl AccuracyMetrics {
    /// Clips each sub-score to [0, 1] and blends them 0.4 / 0.3 / 0.3.
    pub fn combine(pattern: f64, statistical: f64, temporal: f64) -> AccuracyMetrics {
        let clip = |x: f64| x.clamp(0.0, 1.0);
        let (p, s, t) = (clip(pattern), clip(statistical), clip(temporal));
        AccuracyMetrics {
            pattern_similarity: p,
            statistical_match: s,
            temporal_consistency: t,
            overall_accuracy: clip(PATTERN_WEIGHT * p + STATISTICAL_WEIGHT * s + TEMPORAL_WEIGHT * t),
        }
    }
}

pub struct AccuracyCalculator<'a> {
    baseline: Option<&'a Baseline>,
}

impl<'a> AccuracyCalculator<'a> {
    pub fn new(baseline: Option<&'a Baseline>) -> AccuracyCalculator<'a> {
        AccuracyCalculator { baseline }
    }

    pub fn calculate_accuracy(&self, session: &ProcessedSession) -> Result<AccuracyMetrics> {
        let baseline = self.baseline.ok_or(AnalyzerError::NotInitialized("baseline"))?;

        let raw = session.raw_samples();
        let features: Vec<Electrical> = raw
            .iter()
            .map(|s| Electrical {
                voltage: s.voltage,
                current: s.current,
                resistance: s.resistance,
            })
            .collect();

        let pattern = or_neutral("pattern_similarity", pattern_similarity(&features, &baseline.features));
        let statistical = or_neutral(
            "statistical_match",
            statistical_match(&SummaryStatistics::of(&raw), &baseline.statistics),
        );
        let temporal = or_neutral(
            "temporal_consistency",
            temporal_consistency(&session.column(Channel::Voltage), &session.column(Channel::Current)),
        );
        Ok(AccuracyMetrics::combine(pattern, statistical, temporal))
    }
}

fn or_neutral(score: &'static str, value: std::result::Result<f64, ComputationError>) -> f64 {
    value.unwrap_or_else(|e| {
        warn!(score, error = %e, "sub-score fell back to neutral");
        NEUTRAL_SCORE
    })
}

fn flatten(rows: &[Electrical]) -> impl Iterator<Item = f64> + '_ {
    rows.iter().flat_map(|e| [e.voltage, e.current, e.resistance])
}

/// Cosine similarity of the flattened channel matrices over their common
/// prefix. Zero when either side has zero norm.
pub fn pattern_similarity(session: &[Electrical], baseline: &[Electrical]) -> std::result::Result<f64, ComputationError> {
    let n = session.len().min(baseline.len());
    let (a, b) = (&session[..n], &baseline[..n]);

    let norm_a = flatten(a).map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = flatten(b).map(|x| x * x).sum::<f64>().sqrt();
    if !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(ComputationError::NonFinite);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    let dot: f64 = flatten(a).zip(flatten(b)).map(|(x, y)| x * y).sum();
    let cosine = dot / (norm_a * norm_b);
    if !cosine.is_finite() {
        return Err(ComputationError::NonFinite);
    }
    Ok(cosine.clamp(0.0, 1.0))
}

/// Mean of `max(0, 1 - relative deviation)` over the statistics both sides
/// have, skipping zero baseline values. Neutral when nothing is comparable.
pub fn statistical_match(
    session: &SummaryStatistics,
    baseline: &SummaryStatistics,
) -> std::result::Result<f64, ComputationError> {
    let matches: Vec<f64> = session
        .entries()
        .iter()
        .zip(baseline.entries().iter())
        .filter_map(|((_, ours), (_, theirs))| match (ours, theirs) {
            (Some(x), Some(r)) if *r != 0.0 => Some((1.0 - (x - r).abs() / r.abs()).max(0.0)),
            _ => None,
        })
        .collect();
    match stats::mean(&matches) {
        None => Ok(NEUTRAL_SCORE),
        Some(m) if m.is_finite() => Ok(m),
        Some(_) => Err(ComputationError::NonFinite),
    }
}

/// Share of first differences whose magnitude stays within three standard
/// deviations of the channel's differences, averaged over voltage and current.
pub fn temporal_consistency(voltage: &[f64], current: &[f64]) -> std::result::Result<f64, ComputationError> {
    Ok((stability(voltage)? + stability(current)?) / 2.0)
}

fn stability(values: &[f64]) -> std::result::Result<f64, ComputationError> {
    let diffs = stats::diff(values);
    let spread = stats::sample_std(&diffs).ok_or(ComputationError::EmptyInput)?;
    if !spread.is_finite() {
        return Err(ComputationError::NonFinite);
    }
    let limit = JUMP_SIGMAS * spread;
    let jumps = diffs.iter().filter(|d| d.abs() > limit).count();
    Ok(1.0 - jumps as f64 / diffs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Sample;

    fn rows(values: &[(f64, f64, f64)]) -> Vec<Electrical> {
        values
            .iter()
            .map(|&(voltage, current, resistance)| Electrical { voltage, current, resistance })
            .collect()
    }

    #[test]
    fn combine_extremes() {
        assert_eq!(AccuracyMetrics::combine(1.0, 1.0, 1.0).overall_accuracy, 1.0);
        assert_eq!(AccuracyMetrics::combine(0.0, 0.0, 0.0).overall_accuracy, 0.0);
        let m = AccuracyMetrics::combine(1.5, -0.2, 0.5);
        assert_eq!(m.pattern_similarity, 1.0);
        assert_eq!(m.statistical_match, 0.0);
        assert!((m.overall_accuracy - 0.55).abs() < 1e-12);
    }

    #[test]
    fn cosine_truncates_to_shorter() {
        let a = rows(&[(1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        let b = rows(&[(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (5.0, 5.0, 5.0)]);
        assert!((pattern_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_zero_norm_and_negative() {
        let zero = rows(&[(0.0, 0.0, 0.0)]);
        let one = rows(&[(1.0, 1.0, 1.0)]);
        assert_eq!(pattern_similarity(&zero, &one), Ok(0.0));
        assert_eq!(pattern_similarity(&[], &one), Ok(0.0));
        let neg = rows(&[(-1.0, -1.0, -1.0)]);
        assert_eq!(pattern_similarity(&neg, &one), Ok(0.0));
    }

    #[test]
    fn statistical_match_skips_missing_and_zero() {
        let baseline = SummaryStatistics {
            voltage_mean: Some(100.0),
            voltage_std: Some(0.0),
            current_mean: None,
            ..SummaryStatistics::default()
        };
        let session = SummaryStatistics {
            voltage_mean: Some(90.0),
            voltage_std: Some(3.0),
            current_mean: Some(1.0),
            ..SummaryStatistics::default()
        };
        assert!((statistical_match(&session, &baseline).unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(
            statistical_match(&SummaryStatistics::default(), &baseline),
            Ok(NEUTRAL_SCORE)
        );
    }

    #[test]
    fn statistical_match_floors_at_zero() {
        let baseline = SummaryStatistics { voltage_mean: Some(1.0), ..SummaryStatistics::default() };
        let session = SummaryStatistics { voltage_mean: Some(10.0), ..SummaryStatistics::default() };
        assert_eq!(statistical_match(&session, &baseline), Ok(0.0));
    }

    #[test]
    fn temporal_consistency_counts_jumps() {
        let mut voltage: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        voltage.push(100.0);
        let current = vec![0.5; 41];
        let score = temporal_consistency(&voltage, &current).unwrap();
        // one jump out of 40 diffs on voltage, flat current
        assert!((score - (1.0 - 1.0 / 40.0 + 1.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn steady_ramp_has_no_stable_steps() {
        // constant nonzero steps: zero spread, so every step lies beyond 3 sigma
        let voltage: Vec<f64> = (0..41).map(|i| i as f64 * 25.0).collect();
        let mut current: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        current.push(100.0);
        let score = temporal_consistency(&voltage, &current).unwrap();
        assert!((score - 0.4875).abs() < 1e-12);
    }

    #[test]
    fn short_sessions_fall_back_to_neutral() {
        assert_eq!(temporal_consistency(&[1.0, 2.0], &[1.0, 2.0]), Err(ComputationError::EmptyInput));

        let baseline = Baseline {
            features: rows(&[(1000.0, 0.001, 1e6)]),
            normalized: vec![Sample::default()],
            statistics: SummaryStatistics::of(&[Sample::new(0.0, 1000.0, 0.001, 1e6)]),
        };
        let session = ProcessedSession {
            samples: vec![crate::session::ProcessedSample {
                raw: Sample::new(0.0, 1000.0, 0.001, 1e6),
                normalized: Sample::default(),
                diff: Electrical::default(),
                rolling_mean: None,
            }],
        };
        let m = AccuracyCalculator::new(Some(&baseline)).calculate_accuracy(&session).unwrap();
        assert_eq!(m.temporal_consistency, NEUTRAL_SCORE);
        assert!((m.pattern_similarity - 1.0).abs() < 1e-12);
        assert!((m.statistical_match - 1.0).abs() < 1e-12);
    }

    #[test]
    fn requires_a_baseline() {
        let calc = AccuracyCalculator::new(None);
        assert!(matches!(
            calc.calculate_accuracy(&ProcessedSession::default()),
            Err(AnalyzerError::NotInitialized(_))
        ));
    }
}
