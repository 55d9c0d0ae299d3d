/// Categorical cross-entropy over raw logits (softmax folded in).
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Numerically stable softmax.
    pub fn softmax(logits: &[f64]) -> Vec<f64> {
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

    /// L = -log(softmax(logits)[target]), computed with log-sum-exp.
    pub fn loss(logits: &[f64], target: usize) -> f64 {
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = logits.iter().map(|z| (z - max).exp()).sum::<f64>().ln() + max;
        log_sum - logits[target]
    }

    /// Gradient w.r.t. the logits:
    ///   ∂L/∂z_i = softmax(z)_i - [i == target]
    pub fn derivative(logits: &[f64], target: usize) -> Vec<f64> {
        let mut grad = CrossEntropyLoss::softmax(logits);
        grad[target] -= 1.0;
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::CrossEntropyLoss;

    #[test]
    fn uniform_logits_give_log_k() {
        let l = CrossEntropyLoss::loss(&[0.0; 5], 0);
        assert!((l - 5f64.ln()).abs() < 1e-12);
        let g = CrossEntropyLoss::derivative(&[0.0; 5], 0);
        assert!((g[0] + 0.8).abs() < 1e-12);
        assert!((g.iter().sum::<f64>()).abs() < 1e-12);
    }

    #[test]
    fn large_logits_stay_finite() {
        assert!(CrossEntropyLoss::loss(&[1000.0, -1000.0], 1).is_finite());
    }
}
