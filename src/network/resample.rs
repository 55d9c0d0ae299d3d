//! Fixed-length conversion of variable-length sequences.

/// Common length for a set of sequences: the longest one, capped at `cap`.
pub fn target_length<I: IntoIterator<Item = usize>>(lengths: I, cap: usize) -> usize {
    lengths.into_iter().max().unwrap_or(0).min(cap)
}

/// Brings `sequence` to exactly `target` rows.
///
/// Longer sequences keep rows at evenly spaced indices `⌊i·(n−1)/(target−1)⌋`
/// (first and last rows always kept); shorter ones repeat their last row.
/// Empty input stays empty.
pub fn to_fixed_length(sequence: &[Vec<f64>], target: usize) -> Vec<Vec<f64>> {
    let n = sequence.len();
    if n == 0 || target == 0 {
        return Vec::new();
    }
    if n > target {
        if target == 1 {
            return vec![sequence[0].clone()];
        }
        return (0..target)
            .map(|i| sequence[i * (n - 1) / (target - 1)].clone())
            .collect();
    }
    let mut out = sequence.to_vec();
    let last = sequence[n - 1].clone();
    out.resize(target, last);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn subsamples_evenly() {
        let out = to_fixed_length(&seq(10), 4);
        assert_eq!(out, vec![vec![0.0], vec![3.0], vec![6.0], vec![9.0]]);
    }

    #[test]
    fn pads_with_last_row() {
        let out = to_fixed_length(&seq(2), 4);
        assert_eq!(out, vec![vec![0.0], vec![1.0], vec![1.0], vec![1.0]]);
    }

    #[test]
    fn identity_at_target() {
        assert_eq!(to_fixed_length(&seq(5), 5), seq(5));
    }

    #[test]
    fn target_is_capped() {
        assert_eq!(target_length([30, 1500, 80], 1000), 1000);
        assert_eq!(target_length([30, 80], 1000), 80);
        assert_eq!(target_length(Vec::new(), 1000), 0);
    }
}
