/// What the loop should do after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best loss; snapshot the parameters.
    Improved,
    Continue,
    Stop,
}

/// Best-loss tracking with a patience counter.
///
/// An epoch improves only if its loss is strictly below the best so far.
/// Once `patience` epochs in a row fail to improve, the verdict is `Stop`,
/// so a run whose last improvement was epoch `k` ends at epoch `k + patience`.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_loss: f64,
    best_epoch: Option<usize>,
    counter: usize,
    epochs_seen: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> EarlyStopping {
        EarlyStopping {
            patience,
            best_loss: f64::INFINITY,
            best_epoch: None,
            counter: 0,
            epochs_seen: 0,
        }
    }

    pub fn observe(&mut self, loss: f64) -> Verdict {
        self.epochs_seen += 1;
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = Some(self.epochs_seen);
            self.counter = 0;
            return Verdict::Improved;
        }
        self.counter += 1;
        if self.counter >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Continue
        }
    }

    /// `None` until some epoch produced a finite improvement.
    pub fn best_loss(&self) -> Option<f64> {
        self.best_epoch.map(|_| self.best_loss)
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn counter(&self) -> usize {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `losses` until `Stop` or the cap; returns epochs run.
    fn epochs_run(losses: &[f64], patience: usize) -> usize {
        let mut stopper = EarlyStopping::new(patience);
        for (i, &loss) in losses.iter().enumerate() {
            if stopper.observe(loss) == Verdict::Stop {
                return i + 1;
            }
        }
        losses.len()
    }

    #[test]
    fn halts_exactly_patience_epochs_after_last_improvement() {
        let patience = 4;
        let k = 3;
        // improves through epoch k, then flat
        let mut losses = vec![3.0, 2.0, 1.0];
        losses.extend(std::iter::repeat(1.5).take(20));

        assert_eq!(epochs_run(&losses, patience), k + patience);

        let mut stopper = EarlyStopping::new(patience);
        let verdicts: Vec<Verdict> = losses.iter().take(k + patience).map(|&l| stopper.observe(l)).collect();
        assert_eq!(verdicts[k + patience - 2], Verdict::Continue);
        assert_eq!(verdicts[k + patience - 1], Verdict::Stop);
        assert_eq!(stopper.best_epoch(), Some(k));
        assert_eq!(stopper.best_loss(), Some(1.0));
    }

    #[test]
    fn equal_loss_is_not_an_improvement() {
        let mut stopper = EarlyStopping::new(2);
        assert_eq!(stopper.observe(1.0), Verdict::Improved);
        assert_eq!(stopper.observe(1.0), Verdict::Continue);
        assert_eq!(stopper.observe(1.0), Verdict::Stop);
    }

    #[test]
    fn improvement_resets_counter() {
        let mut stopper = EarlyStopping::new(2);
        stopper.observe(5.0);
        stopper.observe(6.0);
        assert_eq!(stopper.counter(), 1);
        assert_eq!(stopper.observe(4.0), Verdict::Improved);
        assert_eq!(stopper.counter(), 0);
    }

    #[test]
    fn nan_never_improves() {
        let mut stopper = EarlyStopping::new(3);
        assert_eq!(stopper.observe(f64::NAN), Verdict::Continue);
        assert_eq!(stopper.best_loss(), None);
    }

    #[test]
    fn runs_to_cap_while_improving() {
        let losses: Vec<f64> = (0..10).map(|i| 10.0 - i as f64).collect();
        assert_eq!(epochs_run(&losses, 2), 10);
    }
}
