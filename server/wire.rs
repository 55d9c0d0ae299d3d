//! Request bodies accepted by the service.

use serde::Deserialize;

use hipot_analyzer::{RawSession, Sample};

/// One session as posted by test stations. `null` entries are missing readings.
#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    #[serde(rename = "Time", default)]
    pub time: Vec<Option<f64>>,
    #[serde(rename = "Voltage", default)]
    pub voltage: Vec<Option<f64>>,
    #[serde(rename = "Current", default)]
    pub current: Vec<Option<f64>>,
    #[serde(rename = "Resistance", default)]
    pub resistance: Vec<Option<f64>>,
}

fn column(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

impl SessionPayload {
    pub fn into_session(self) -> RawSession {
        RawSession {
            time: column(self.time),
            voltage: column(self.voltage),
            current: column(self.current),
            resistance: column(self.resistance),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub training_data: Vec<SessionPayload>,
}

/// A single measurement; absent fields read as zero.
#[derive(Debug, Deserialize)]
pub struct SamplePayload {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub voltage: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub resistance: f64,
}

impl SamplePayload {
    pub fn to_sample(&self) -> Sample {
        Sample::new(self.time, self.voltage, self.current, self.resistance)
    }
}
