//! Missing-value filling along sample order.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::session::RawSession;

/// How interior gaps are filled. Edge gaps are always forward then backward filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    /// Ties go to the earlier neighbour.
    Nearest,
}

impl Interpolation {
    pub fn for_len(len: usize, linear_below: usize) -> Interpolation {
        if len < linear_below {
            Interpolation::Linear
        } else {
            Interpolation::Nearest
        }
    }
}

/// Fills every `NaN` in `column` in place. A column with no finite value is
/// left untouched.
pub fn fill_column(column: &mut [f64], method: Interpolation) {
    let n = column.len();
    // index of the next known value at or after i
    let mut next_known = vec![None; n];
    let mut next = None;
    for i in (0..n).rev() {
        if !column[i].is_nan() {
            next = Some(i);
        }
        next_known[i] = next;
    }

    let mut prev: Option<usize> = None;
    for i in 0..n {
        if !column[i].is_nan() {
            prev = Some(i);
            continue;
        }
        column[i] = match (prev, next_known[i]) {
            (Some(p), Some(q)) => match method {
                Interpolation::Linear => {
                    let frac = (i - p) as f64 / (q - p) as f64;
                    column[p] + (column[q] - column[p]) * frac
                }
                Interpolation::Nearest => {
                    if i - p <= q - i {
                        column[p]
                    } else {
                        column[q]
                    }
                }
            },
            (Some(p), None) => column[p],
            (None, Some(q)) => column[q],
            (None, None) => f64::NAN,
        };
    }
}

/// Sequential path.
pub fn fill_missing(session: &mut RawSession, linear_below: usize) {
    if !session.has_missing() {
        return;
    }
    let method = Interpolation::for_len(session.len(), linear_below);
    for column in session.columns_mut() {
        fill_column(column, method);
    }
}

/// Pool path: one column per task. Produces exactly what `fill_missing` does.
pub fn fill_missing_parallel(session: &mut RawSession, linear_below: usize, pool: &ThreadPool) {
    if !session.has_missing() {
        return;
    }
    let method = Interpolation::for_len(session.len(), linear_below);
    let mut columns = session.columns_mut();
    pool.install(|| {
        columns.par_iter_mut().for_each(|column| fill_column(column, method));
    });
}
