use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};
use crate::math::stats;
use crate::session::sample::{Channel, ProcessedSample, Sample};

/// A session as captured: four equal-length columns. `NaN` marks a missing
/// reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSession {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl RawSession {
    /// Builds a session and validates it.
    pub fn new(time: Vec<f64>, voltage: Vec<f64>, current: Vec<f64>, resistance: Vec<f64>) -> Result<RawSession> {
        let session = RawSession { time, voltage, current, resistance };
        session.validate()?;
        Ok(session)
    }

    /// Rejects empty or ragged columns, infinities, and columns with no
    /// reading at all.
    pub fn validate(&self) -> Result<()> {
        let n = self.time.len();
        for (channel, column) in Channel::ALL.iter().zip(self.columns()) {
            if column.is_empty() {
                return Err(AnalyzerError::Validation(format!("{} column is empty", channel.name())));
            }
            if column.len() != n {
                return Err(AnalyzerError::Validation(format!(
                    "{} has {} values, time has {}",
                    channel.name(),
                    column.len(),
                    n
                )));
            }
            if column.iter().any(|v| v.is_infinite()) {
                return Err(AnalyzerError::Validation(format!("{} contains an infinite value", channel.name())));
            }
            if column.iter().all(|v| v.is_nan()) {
                return Err(AnalyzerError::Validation(format!("{} has no readings", channel.name())));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn columns(&self) -> [&Vec<f64>; 4] {
        [&self.time, &self.voltage, &self.current, &self.resistance]
    }

    pub fn columns_mut(&mut self) -> [&mut Vec<f64>; 4] {
        [&mut self.time, &mut self.voltage, &mut self.current, &mut self.resistance]
    }

    pub fn column(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Time => &self.time,
            Channel::Voltage => &self.voltage,
            Channel::Current => &self.current,
            Channel::Resistance => &self.resistance,
        }
    }

    pub fn has_missing(&self) -> bool {
        self.columns().iter().any(|c| c.iter().any(|v| v.is_nan()))
    }

    pub fn sample(&self, index: usize) -> Sample {
        Sample::new(self.time[index], self.voltage[index], self.current[index], self.resistance[index])
    }

    /// Keeps only rows whose flag is `true`, preserving order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in self.columns_mut() {
            let mut flags = keep.iter();
            column.retain(|_| *flags.next().unwrap_or(&false));
        }
    }
}

/// Descriptive summary of a preprocessed session, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub count: usize,
    pub duration: f64,
    pub voltage_range: [f64; 2],
    pub current_range: [f64; 2],
    pub resistance_range: [f64; 2],
}

/// The preprocessor's output: outliers removed, derived features attached.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessedSession {
    pub samples: Vec<ProcessedSample>,
}

impl ProcessedSession {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raw values of one channel in time order.
    pub fn column(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.raw.get(channel)).collect()
    }

    pub fn raw_samples(&self) -> Vec<Sample> {
        self.samples.iter().map(|s| s.raw).collect()
    }

    /// Rows of the four normalized channels; what the sequence model consumes.
    pub fn normalized_sequence(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.normalized.to_vec()).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        let range = |channel| {
            stats::min_max(&self.column(channel)).map_or([0.0, 0.0], |(lo, hi)| [lo, hi])
        };
        let time = range(Channel::Time);
        SessionSummary {
            count: self.len(),
            duration: time[1] - time[0],
            voltage_range: range(Channel::Voltage),
            current_range: range(Channel::Current),
            resistance_range: range(Channel::Resistance),
        }
    }
}
