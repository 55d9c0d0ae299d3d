pub mod dense;
pub mod lstm;
pub mod norm;
pub mod param;

pub use dense::Dense;
pub use lstm::LstmLayer;
pub use norm::LayerNorm;
pub use param::{clip_grad_norm, Param};
