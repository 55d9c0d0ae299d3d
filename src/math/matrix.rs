use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Row-major dense matrix.
///
/// Vectors are treated as row vectors (`1 × n`), so a dense layer computes
/// `x · W` with `W` shaped `(fan_in, fan_out)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Samples from U(-bound, bound). Used for recurrent weights.
    pub fn uniform(rows: usize, cols: usize, bound: f64, rng: &mut StdRng) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for x in row.iter_mut() {
                *x = rng.gen_range(-bound..=bound);
            }
        }
        res
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    pub fn sample_standard_normal(rng: &mut StdRng) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// He initialization: samples from N(0, sqrt(2 / rows)).
    ///
    /// Used before ReLU layers. `rows` is the fan-in.
    pub fn he(rows: usize, cols: usize, rng: &mut StdRng) -> Matrix {
        Matrix::gaussian(rows, cols, (2.0 / rows as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / rows)).
    ///
    /// Used before Identity output layers. `rows` is the fan-in.
    pub fn xavier(rows: usize, cols: usize, rng: &mut StdRng) -> Matrix {
        Matrix::gaussian(rows, cols, (1.0 / rows as f64).sqrt(), rng)
    }

    fn gaussian(rows: usize, cols: usize, std_dev: f64, rng: &mut StdRng) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for x in row.iter_mut() {
                *x = Matrix::sample_standard_normal(rng) * std_dev;
            }
        }
        res
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Row vector times matrix: `x · self`, where `x.len() == self.rows`.
    pub fn left_mul(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.rows, "left_mul: length mismatch");
        let mut out = vec![0.0; self.cols];
        for (xi, row) in x.iter().zip(self.data.iter()) {
            if *xi == 0.0 {
                continue;
            }
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += xi * w;
            }
        }
        out
    }

    /// Row vector times transpose: `d · selfᵀ`, where `d.len() == self.cols`.
    /// This is how a delta is pushed back through a weight matrix.
    pub fn mul_transposed(&self, d: &[f64]) -> Vec<f64> {
        debug_assert_eq!(d.len(), self.cols, "mul_transposed: length mismatch");
        self.data
            .iter()
            .map(|row| row.iter().zip(d.iter()).map(|(w, g)| w * g).sum())
            .collect()
    }

    /// Accumulates the outer product `aᵀ · b` into `self`.
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        debug_assert_eq!(a.len(), self.rows);
        debug_assert_eq!(b.len(), self.cols);
        for (ai, row) in a.iter().zip(self.data.iter_mut()) {
            if *ai == 0.0 {
                continue;
            }
            for (x, bj) in row.iter_mut().zip(b.iter()) {
                *x += ai * bj;
            }
        }
    }

    /// Adds `v` to row 0. Bias gradients are `1 × n` matrices.
    pub fn add_row(&mut self, v: &[f64]) {
        for (x, g) in self.data[0].iter_mut().zip(v.iter()) {
            *x += g;
        }
    }

    pub fn fill(&mut self, value: f64) {
        for row in self.data.iter_mut() {
            row.iter_mut().for_each(|x| *x = value);
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for row in self.data.iter_mut() {
            row.iter_mut().for_each(|x| *x *= factor);
        }
    }

    pub fn squared_norm(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum()
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map_or(0, Vec::len),
            data
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m() -> Matrix {
        // 2 × 3
        Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
    }

    #[test]
    fn left_mul_is_row_vector_product() {
        assert_eq!(m().left_mul(&[1.0, -1.0]), vec![-3.0, -3.0, -3.0]);
    }

    #[test]
    fn mul_transposed_pushes_delta_back() {
        assert_eq!(m().mul_transposed(&[1.0, 0.0, 1.0]), vec![4.0, 10.0]);
    }

    #[test]
    fn add_outer_accumulates() {
        let mut g = Matrix::zeros(2, 3);
        g.add_outer(&[1.0, 2.0], &[1.0, 0.0, -1.0]);
        g.add_outer(&[1.0, 2.0], &[1.0, 0.0, -1.0]);
        assert_eq!(g.data, vec![vec![2.0, 0.0, -2.0], vec![4.0, 0.0, -4.0]]);
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let a = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
