pub mod head;
pub mod resample;
pub mod sequence_model;
pub mod spec;

pub use sequence_model::{Mode, ModelOutput, SequenceModel};
pub use spec::ModelConfig;
