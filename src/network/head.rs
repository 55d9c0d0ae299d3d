use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::{dense::Dense, norm::LayerNorm, param::Param};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HeadLayer {
    Dense(Dense),
    Norm(LayerNorm),
}

/// A feed-forward stack: `(Dense → ReLU [→ LayerNorm])*` then a linear output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Head {
    pub layers: Vec<HeadLayer>,
}

impl Head {
    pub fn new(
        input_size: usize,
        widths: &[usize],
        output_size: usize,
        normalize: bool,
        rng: &mut StdRng,
    ) -> Head {
        let mut layers = Vec::new();
        let mut prev = input_size;
        for &width in widths {
            layers.push(HeadLayer::Dense(Dense::new(prev, width, ActivationFunction::ReLU, rng)));
            if normalize {
                layers.push(HeadLayer::Norm(LayerNorm::new(width)));
            }
            prev = width;
        }
        layers.push(HeadLayer::Dense(Dense::new(prev, output_size, ActivationFunction::Identity, rng)));
        Head { layers }
    }

    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = match layer {
                HeadLayer::Dense(d) => d.forward(&current),
                HeadLayer::Norm(n) => n.forward(&current),
            };
        }
        current
    }

    pub fn forward_train(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = match layer {
                HeadLayer::Dense(d) => d.forward_train(&current),
                HeadLayer::Norm(n) => n.forward_train(&current),
            };
        }
        current
    }

    /// Backward pass; returns ∂L/∂input.
    pub fn backward(&mut self, grad_out: &[f64]) -> Vec<f64> {
        let mut delta = grad_out.to_vec();
        for layer in self.layers.iter_mut().rev() {
            delta = match layer {
                HeadLayer::Dense(d) => d.backward(&delta),
                HeadLayer::Norm(n) => n.backward(&delta),
            };
        }
        delta
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = Vec::new();
        for layer in &mut self.layers {
            match layer {
                HeadLayer::Dense(d) => params.extend(d.params_mut()),
                HeadLayer::Norm(n) => params.extend(n.params_mut()),
            }
        }
        params
    }

    pub fn clear_cache(&mut self) {
        for layer in &mut self.layers {
            match layer {
                HeadLayer::Dense(d) => d.clear_cache(),
                HeadLayer::Norm(n) => n.clear_cache(),
            }
        }
    }
}
