use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::ActivationFunction, layers::param::Param, math::matrix::Matrix};

const SIGMOID: ActivationFunction = ActivationFunction::Sigmoid;
const TANH: ActivationFunction = ActivationFunction::Tanh;

/// Values from one time step kept for backpropagation through time.
#[derive(Debug, Clone)]
struct StepCache {
    x: Vec<f64>,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    input_gate: Vec<f64>,
    forget_gate: Vec<f64>,
    candidate: Vec<f64>,
    output_gate: Vec<f64>,
    tanh_c: Vec<f64>,
    h: Vec<f64>,
    c: Vec<f64>,
}

/// One recurrent LSTM layer.
///
/// Gate pre-activations are laid out as `[input | forget | candidate | output]`
/// along the columns of `w_ih` (`input_size × 4H`), `w_hh` (`H × 4H`) and `bias`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    pub w_ih: Param,
    pub w_hh: Param,
    pub bias: Param,
    #[serde(skip)]
    steps: Vec<StepCache>,
}

impl LstmLayer {
    /// Weights drawn from U(-1/√H, 1/√H).
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> LstmLayer {
        let bound = 1.0 / (hidden_size as f64).sqrt();
        LstmLayer {
            input_size,
            hidden_size,
            w_ih: Param::new(Matrix::uniform(input_size, 4 * hidden_size, bound, rng)),
            w_hh: Param::new(Matrix::uniform(hidden_size, 4 * hidden_size, bound, rng)),
            bias: Param::new(Matrix::uniform(1, 4 * hidden_size, bound, rng)),
            steps: Vec::new(),
        }
    }

    fn step(&self, x: &[f64], h_prev: &[f64], c_prev: &[f64]) -> StepCache {
        let hs = self.hidden_size;
        let mut z = self.w_ih.value.left_mul(x);
        let recurrent = self.w_hh.value.left_mul(h_prev);
        for ((zi, r), b) in z.iter_mut().zip(recurrent.iter()).zip(self.bias.value.data[0].iter()) {
            *zi += r + b;
        }

        let input_gate: Vec<f64> = z[..hs].iter().map(|&v| SIGMOID.function(v)).collect();
        let forget_gate: Vec<f64> = z[hs..2 * hs].iter().map(|&v| SIGMOID.function(v)).collect();
        let candidate: Vec<f64> = z[2 * hs..3 * hs].iter().map(|&v| TANH.function(v)).collect();
        let output_gate: Vec<f64> = z[3 * hs..].iter().map(|&v| SIGMOID.function(v)).collect();

        let c: Vec<f64> = (0..hs)
            .map(|k| forget_gate[k] * c_prev[k] + input_gate[k] * candidate[k])
            .collect();
        let tanh_c: Vec<f64> = c.iter().map(|v| v.tanh()).collect();
        let h: Vec<f64> = (0..hs).map(|k| output_gate[k] * tanh_c[k]).collect();

        StepCache {
            x: x.to_vec(),
            h_prev: h_prev.to_vec(),
            c_prev: c_prev.to_vec(),
            input_gate,
            forget_gate,
            candidate,
            output_gate,
            tanh_c,
            h,
            c,
        }
    }

    /// Runs the sequence from a zero state and returns every hidden state.
    pub fn forward(&self, sequence: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let mut h = vec![0.0; self.hidden_size];
        let mut c = vec![0.0; self.hidden_size];
        let mut outputs = Vec::with_capacity(sequence.len());
        for x in sequence {
            let s = self.step(x, &h, &c);
            h = s.h;
            c = s.c;
            outputs.push(h.clone());
        }
        outputs
    }

    /// Same as `forward`, keeping each step for `backward`.
    pub fn forward_train(&mut self, sequence: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let mut h = vec![0.0; self.hidden_size];
        let mut c = vec![0.0; self.hidden_size];
        let mut steps = Vec::with_capacity(sequence.len());
        let mut outputs = Vec::with_capacity(sequence.len());
        for x in sequence {
            let s = self.step(x, &h, &c);
            h = s.h.clone();
            c = s.c.clone();
            outputs.push(s.h.clone());
            steps.push(s);
        }
        self.steps = steps;
        outputs
    }

    /// Backpropagation through time.
    ///
    /// `grad_h[t]` is ∂L/∂h_t arriving from above. Accumulates parameter
    /// gradients and returns ∂L/∂x_t for every step.
    pub fn backward(&mut self, grad_h: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let hs = self.hidden_size;
        let LstmLayer { steps, w_ih, w_hh, bias, .. } = self;
        debug_assert_eq!(grad_h.len(), steps.len());

        let mut dh_next = vec![0.0; hs];
        let mut dc_next = vec![0.0; hs];
        let mut dx = vec![Vec::new(); steps.len()];
        let mut dz = vec![0.0; 4 * hs];

        for t in (0..steps.len()).rev() {
            let s = &steps[t];
            for k in 0..hs {
                let dh = grad_h[t][k] + dh_next[k];
                let dc = dc_next[k] + dh * s.output_gate[k] * TANH.derivative_from_output(s.tanh_c[k]);

                let d_out = dh * s.tanh_c[k];
                let d_in = dc * s.candidate[k];
                let d_cand = dc * s.input_gate[k];
                let d_forget = dc * s.c_prev[k];
                dc_next[k] = dc * s.forget_gate[k];

                dz[k] = d_in * SIGMOID.derivative_from_output(s.input_gate[k]);
                dz[hs + k] = d_forget * SIGMOID.derivative_from_output(s.forget_gate[k]);
                dz[2 * hs + k] = d_cand * TANH.derivative_from_output(s.candidate[k]);
                dz[3 * hs + k] = d_out * SIGMOID.derivative_from_output(s.output_gate[k]);
            }

            w_ih.grad_mut().add_outer(&s.x, &dz);
            w_hh.grad_mut().add_outer(&s.h_prev, &dz);
            bias.grad_mut().add_row(&dz);
            dx[t] = w_ih.value.mul_transposed(&dz);
            dh_next = w_hh.value.mul_transposed(&dz);
        }
        dx
    }

    pub fn params_mut(&mut self) -> [&mut Param; 3] {
        [&mut self.w_ih, &mut self.w_hh, &mut self.bias]
    }

    pub fn clear_cache(&mut self) {
        self.steps = Vec::new();
    }

    pub(crate) fn cached_steps(&self) -> usize {
        self.steps.len()
    }
}
