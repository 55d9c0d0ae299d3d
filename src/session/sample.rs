use serde::{Deserialize, Serialize};

/// The four measured channels, in model input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Time,
    Voltage,
    Current,
    Resistance,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Time, Channel::Voltage, Channel::Current, Channel::Resistance];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::Voltage => "voltage",
            Channel::Current => "current",
            Channel::Resistance => "resistance",
        }
    }
}

/// One raw measurement: seconds, volts, amperes, ohms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub resistance: f64,
}

impl Sample {
    pub fn new(time: f64, voltage: f64, current: f64, resistance: f64) -> Sample {
        Sample { time, voltage, current, resistance }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Time => self.time,
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
            Channel::Resistance => self.resistance,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.time, self.voltage, self.current, self.resistance]
    }
}

/// A value per electrical channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Electrical {
    pub voltage: f64,
    pub current: f64,
    pub resistance: f64,
}

/// A sample after preprocessing. Raw values are kept next to the derived ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSample {
    pub raw: Sample,
    /// Z-scores of all four channels against the fitted scaler.
    pub normalized: Sample,
    /// First difference to the previous sample; zero for the first one.
    pub diff: Electrical,
    /// Trailing rolling mean, present when the session is long enough to
    /// warrant one; zero until the window fills.
    pub rolling_mean: Option<Electrical>,
}
