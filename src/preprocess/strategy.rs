/// Execution path for the missing-value stage. Both produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    /// Missing values are filled on the worker pool, one column per task.
    Parallel,
}

/// Sessions strictly longer than `threshold` take the parallel path.
pub fn select(len: usize, threshold: usize) -> Strategy {
    if len > threshold {
        Strategy::Parallel
    } else {
        Strategy::Sequential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(select(10_000, 10_000), Strategy::Sequential);
        assert_eq!(select(10_001, 10_000), Strategy::Parallel);
        assert_eq!(select(0, 10_000), Strategy::Sequential);
    }
}
