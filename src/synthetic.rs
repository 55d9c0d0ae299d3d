//! Deterministic hipot-like recordings for demos and tests.

use std::f64::consts::FRAC_PI_4;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::math::Matrix;
use crate::session::RawSession;

/// Sampling interval in seconds.
const DT: f64 = 0.1;

/// A session of `len` samples: voltage swinging around 1 kV, current around
/// 1 mA, resistance following V/I, each with Gaussian noise.
pub fn sample_session(seed: u64, len: usize) -> RawSession {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = RawSession::default();
    for i in 0..len {
        let t = i as f64 * DT;
        let voltage = 1000.0 + 500.0 * (0.5 * t).sin() + 10.0 * Matrix::sample_standard_normal(&mut rng);
        let current = 0.001 + 0.0005 * (0.5 * t + FRAC_PI_4).sin() + 1e-4 * Matrix::sample_standard_normal(&mut rng);
        let resistance = voltage / (current + 1e-10) + 1e6 * Matrix::sample_standard_normal(&mut rng);
        session.time.push(t);
        session.voltage.push(voltage);
        session.current.push(current);
        session.resistance.push(resistance);
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_valid() {
        let a = sample_session(42, 100);
        assert_eq!(a, sample_session(42, 100));
        assert_ne!(a, sample_session(43, 100));
        assert!(a.validate().is_ok());
        assert!(a.current.iter().all(|&c| c > 0.0 && c < 0.01));
    }
}
