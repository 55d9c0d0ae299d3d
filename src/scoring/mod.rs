pub mod accuracy;
pub mod defect;

pub use accuracy::{AccuracyCalculator, AccuracyMetrics};
pub use defect::{calculate_defect_rate, DefectMetrics};
