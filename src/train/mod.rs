pub mod early_stopping;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use early_stopping::{EarlyStopping, Verdict};
pub use train_config::TrainConfig;
pub use trainer::{TrainOutcome, Trainer};
