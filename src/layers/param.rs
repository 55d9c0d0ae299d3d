use serde::{Deserialize, Serialize};

use crate::math::matrix::Matrix;

/// A trainable tensor plus its accumulated gradient and optimizer moments.
///
/// Only `value` is persisted; gradient and moment buffers are rebuilt lazily
/// after a model is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Matrix,
    #[serde(skip)]
    grad: Matrix,
    #[serde(skip)]
    pub(crate) first_moment: Matrix,
    #[serde(skip)]
    pub(crate) second_moment: Matrix,
}

impl Param {
    pub fn new(value: Matrix) -> Param {
        Param {
            value,
            grad: Matrix::default(),
            first_moment: Matrix::default(),
            second_moment: Matrix::default(),
        }
    }

    /// Gradient buffer, allocated on first use with the shape of `value`.
    pub fn grad_mut(&mut self) -> &mut Matrix {
        if self.grad.rows != self.value.rows || self.grad.cols != self.value.cols {
            self.grad = Matrix::zeros(self.value.rows, self.value.cols);
        }
        &mut self.grad
    }

    pub fn grad(&self) -> &Matrix {
        &self.grad
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Drops optimizer moments so a fresh optimizer starts from zero.
    pub(crate) fn reset_moments(&mut self) {
        self.first_moment = Matrix::default();
        self.second_moment = Matrix::default();
    }

    pub fn len(&self) -> usize {
        self.value.rows * self.value.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rescales all gradients so their joint L2 norm is at most `max_norm`.
/// Returns the norm measured before clipping.
pub fn clip_grad_norm(params: &mut [&mut Param], max_norm: f64) -> f64 {
    let total: f64 = params.iter().map(|p| p.grad.squared_norm()).sum::<f64>().sqrt();
    if total > max_norm && total.is_finite() {
        let factor = max_norm / (total + 1e-12);
        for p in params.iter_mut() {
            p.grad.scale(factor);
        }
    }
    total
}
