use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::ActivationFunction, layers::param::Param, math::matrix::Matrix};

/// Fully connected layer: `a = f(x · W + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Param,
    pub biases: Param,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Vec<f64>,
    #[serde(skip)]
    pre_neurons: Vec<f64>,  // pre-activation values (z = xW + b) needed for correct derivative
}

impl Dense {
    pub fn new(input_size: usize, size: usize, activation: ActivationFunction, rng: &mut StdRng) -> Dense {
        let weights = match activation {
            ActivationFunction::ReLU => Matrix::he(input_size, size, rng),
            _ => Matrix::xavier(input_size, size, rng),
        };

        Dense {
            weights: Param::new(weights),
            biases: Param::new(Matrix::zeros(1, size)),
            activator: activation,
            input: Vec::new(),
            pre_neurons: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.weights.value.cols
    }

    fn affine(&self, input: &[f64]) -> Vec<f64> {
        let mut z = self.weights.value.left_mul(input);
        for (zi, b) in z.iter_mut().zip(self.biases.value.data[0].iter()) {
            *zi += b;
        }
        z
    }

    /// Inference forward pass; leaves the layer untouched.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.affine(input).into_iter().map(|z| self.activator.function(z)).collect()
    }

    /// Training forward pass; remembers input and pre-activation for `backward`.
    pub fn forward_train(&mut self, input: &[f64]) -> Vec<f64> {
        let z = self.affine(input);
        let a = z.iter().map(|&x| self.activator.function(x)).collect();
        self.input = input.to_vec();
        self.pre_neurons = z;
        a
    }

    /// Accumulates parameter gradients and returns ∂L/∂x.
    /// `grad_out` is ∂L/∂a for this layer (error in activation space).
    pub fn backward(&mut self, grad_out: &[f64]) -> Vec<f64> {
        // δ = error ⊙ σ'(z)
        let delta: Vec<f64> = grad_out
            .iter()
            .zip(self.pre_neurons.iter())
            .map(|(g, &z)| g * self.activator.derivative(z))
            .collect();

        self.weights.grad_mut().add_outer(&self.input, &delta);
        self.biases.grad_mut().add_row(&delta);
        self.weights.value.mul_transposed(&delta)
    }

    pub fn params_mut(&mut self) -> [&mut Param; 2] {
        [&mut self.weights, &mut self.biases]
    }

    pub fn clear_cache(&mut self) {
        self.input = Vec::new();
        self.pre_neurons = Vec::new();
    }
}
