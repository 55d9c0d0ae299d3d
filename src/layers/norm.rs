use serde::{Deserialize, Serialize};

use crate::{layers::param::Param, math::matrix::Matrix};

/// Per-sample normalization with learnable scale and shift:
/// `y = γ · (x − μ) / √(σ² + ε) + β`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerNorm {
    pub gamma: Param,
    pub beta: Param,
    pub eps: f64,
    #[serde(skip)]
    x_hat: Vec<f64>,
    #[serde(skip)]
    inv_std: f64,
}

impl LayerNorm {
    pub fn new(size: usize) -> LayerNorm {
        let mut gamma = Matrix::zeros(1, size);
        gamma.fill(1.0);
        LayerNorm {
            gamma: Param::new(gamma),
            beta: Param::new(Matrix::zeros(1, size)),
            eps: 1e-5,
            x_hat: Vec::new(),
            inv_std: 0.0,
        }
    }

    fn normalize(&self, input: &[f64]) -> (Vec<f64>, f64) {
        let n = input.len() as f64;
        let mean = input.iter().sum::<f64>() / n;
        let var = input.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let inv_std = 1.0 / (var + self.eps).sqrt();
        (input.iter().map(|x| (x - mean) * inv_std).collect(), inv_std)
    }

    fn affine(&self, x_hat: &[f64]) -> Vec<f64> {
        x_hat
            .iter()
            .zip(self.gamma.value.data[0].iter().zip(self.beta.value.data[0].iter()))
            .map(|(x, (g, b))| g * x + b)
            .collect()
    }

    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let (x_hat, _) = self.normalize(input);
        self.affine(&x_hat)
    }

    pub fn forward_train(&mut self, input: &[f64]) -> Vec<f64> {
        let (x_hat, inv_std) = self.normalize(input);
        let y = self.affine(&x_hat);
        self.x_hat = x_hat;
        self.inv_std = inv_std;
        y
    }

    pub fn backward(&mut self, grad_out: &[f64]) -> Vec<f64> {
        let n = grad_out.len() as f64;
        let d_gamma: Vec<f64> = grad_out.iter().zip(self.x_hat.iter()).map(|(g, x)| g * x).collect();
        self.gamma.grad_mut().add_row(&d_gamma);
        self.beta.grad_mut().add_row(grad_out);

        let d_xhat: Vec<f64> = grad_out
            .iter()
            .zip(self.gamma.value.data[0].iter())
            .map(|(g, gamma)| g * gamma)
            .collect();
        let sum_d: f64 = d_xhat.iter().sum();
        let sum_dx: f64 = d_xhat.iter().zip(self.x_hat.iter()).map(|(d, x)| d * x).sum();

        d_xhat
            .iter()
            .zip(self.x_hat.iter())
            .map(|(d, x)| self.inv_std / n * (n * d - sum_d - x * sum_dx))
            .collect()
    }

    pub fn params_mut(&mut self) -> [&mut Param; 2] {
        [&mut self.gamma, &mut self.beta]
    }

    pub fn clear_cache(&mut self) {
        self.x_hat = Vec::new();
    }
}
