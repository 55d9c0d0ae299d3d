use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::config::Thresholds;
use crate::error::PersistenceError;
use crate::network::SequenceModel;
use crate::preprocess::FitState;

pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to reproduce scoring: model parameters and
/// configuration, the baseline, and the preprocessor's fitted state.
///
/// # Fields
/// * `format_version` - Bumped on incompatible layout changes.
/// * `saved_at`       - When the checkpoint was written.
/// * `sequence_len`   - Fixed length the model was trained on.
/// * `final_loss`     - Best training loss, if known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub sequence_len: usize,
    #[serde(default)]
    pub final_loss: Option<f64>,
    pub thresholds: Thresholds,
    pub model: SequenceModel,
    pub baseline: Baseline,
    pub preprocessor: FitState,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl Checkpoint {
    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a checkpoint, rejecting other format versions before reading
    /// the body.
    pub fn from_json_str(json: &str) -> Result<Checkpoint, PersistenceError> {
        let probe: VersionProbe = serde_json::from_str(json)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: probe.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), PersistenceError> {
        let io_err = |source: std::io::Error| PersistenceError::Io { path: path.to_path_buf(), source };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(io_err)
    }

    pub fn load_json(path: &Path) -> Result<Checkpoint, PersistenceError> {
        let io_err = |source: std::io::Error| PersistenceError::Io { path: path.to_path_buf(), source };
        let file = File::open(path).map_err(io_err)?;
        let mut json = String::new();
        std::io::Read::read_to_string(&mut BufReader::new(file), &mut json).map_err(io_err)?;
        Checkpoint::from_json_str(&json)
    }
}
