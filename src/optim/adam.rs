use crate::{layers::param::Param, math::matrix::Matrix};

/// Adam optimizer. Moment estimates live on each `Param`.
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-8, t: 0 }
    }

    /// Applies one update to every parameter from its accumulated gradient.
    pub fn step(&mut self, params: &mut [&mut Param]) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for p in params.iter_mut() {
            let (rows, cols) = (p.value.rows, p.value.cols);
            if p.first_moment.rows != rows || p.first_moment.cols != cols {
                p.first_moment = Matrix::zeros(rows, cols);
                p.second_moment = Matrix::zeros(rows, cols);
            }
            let grad = p.grad_mut().clone();
            for i in 0..rows {
                for j in 0..cols {
                    let g = grad.data[i][j];
                    let m = self.beta1 * p.first_moment.data[i][j] + (1.0 - self.beta1) * g;
                    let v = self.beta2 * p.second_moment.data[i][j] + (1.0 - self.beta2) * g * g;
                    p.first_moment.data[i][j] = m;
                    p.second_moment.data[i][j] = v;
                    let m_hat = m / bias1;
                    let v_hat = v / bias2;
                    p.value.data[i][j] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_against_gradient_by_lr() {
        let mut p = Param::new(Matrix::zeros(1, 2));
        p.grad_mut().add_row(&[0.5, -2.0]);
        let mut adam = Adam::new(0.1);
        adam.step(&mut [&mut p]);
        // m̂ / √v̂ = sign(g) on the first step
        assert!((p.value.data[0][0] + 0.1).abs() < 1e-6);
        assert!((p.value.data[0][1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_learning_rate_leaves_values() {
        let mut p = Param::new(Matrix::zeros(1, 1));
        p.grad_mut().add_row(&[3.0]);
        Adam::new(0.0).step(&mut [&mut p]);
        assert_eq!(p.value.data[0][0], 0.0);
    }
}
