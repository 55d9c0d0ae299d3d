use crate::session::{Electrical, ProcessedSample, Sample};

/// Rolling-mean window for a session of `len` samples, or `None` when the
/// session is too short for one.
pub fn rolling_window(len: usize) -> Option<usize> {
    let window = (len / 10).min(5);
    (window > 1).then_some(window)
}

fn electrical(sample: &Sample) -> Electrical {
    Electrical {
        voltage: sample.voltage,
        current: sample.current,
        resistance: sample.resistance,
    }
}

/// Attaches first differences and the trailing rolling mean to each
/// (raw, normalized) pair. Values that cannot be computed yet are zero.
pub fn attach(rows: Vec<(Sample, Sample)>) -> Vec<ProcessedSample> {
    let window = rolling_window(rows.len());
    let raw: Vec<Electrical> = rows.iter().map(|(r, _)| electrical(r)).collect();

    rows.iter()
        .enumerate()
        .map(|(i, (raw_sample, normalized))| {
            let diff = if i == 0 {
                Electrical::default()
            } else {
                Electrical {
                    voltage: raw[i].voltage - raw[i - 1].voltage,
                    current: raw[i].current - raw[i - 1].current,
                    resistance: raw[i].resistance - raw[i - 1].resistance,
                }
            };
            let rolling_mean = window.map(|w| {
                if i + 1 < w {
                    return Electrical::default();
                }
                let span = &raw[i + 1 - w..=i];
                let n = w as f64;
                Electrical {
                    voltage: span.iter().map(|e| e.voltage).sum::<f64>() / n,
                    current: span.iter().map(|e| e.current).sum::<f64>() / n,
                    resistance: span.iter().map(|e| e.resistance).sum::<f64>() / n,
                }
            });
            ProcessedSample {
                raw: *raw_sample,
                normalized: *normalized,
                diff,
                rolling_mean,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<(Sample, Sample)> {
        (0..n)
            .map(|i| {
                let s = Sample::new(i as f64, i as f64 * 2.0, 1.0, 100.0);
                (s, s)
            })
            .collect()
    }

    #[test]
    fn window_rule() {
        assert_eq!(rolling_window(19), None);
        assert_eq!(rolling_window(20), Some(2));
        assert_eq!(rolling_window(49), Some(4));
        assert_eq!(rolling_window(5_000), Some(5));
    }

    #[test]
    fn short_session_has_diffs_only() {
        let out = attach(rows(5));
        assert_eq!(out[0].diff, Electrical::default());
        assert_eq!(out[3].diff.voltage, 2.0);
        assert!(out.iter().all(|s| s.rolling_mean.is_none()));
    }

    #[test]
    fn rolling_mean_is_trailing_and_zero_filled() {
        let out = attach(rows(30));
        // window 3
        assert_eq!(out[1].rolling_mean, Some(Electrical::default()));
        let m = out[2].rolling_mean.unwrap();
        assert_eq!(m.voltage, 2.0);
        assert_eq!(m.resistance, 100.0);
    }
}
