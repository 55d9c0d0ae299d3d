pub mod classification;
pub mod sample;
pub mod session;

pub use classification::Classification;
pub use sample::{Channel, Electrical, ProcessedSample, Sample};
pub use session::{ProcessedSession, RawSession, SessionSummary};
