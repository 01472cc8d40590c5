//! Enabled-state persistence between sessions
//!
//! The blob remembers which fields and groups were on when the dashboard
//! last exited, keyed by the fieldspec it was running with:
//!
//! ```json
//! { "last_state": { "fieldspec_path": "/home/me/spec.toml",
//!                   "groups": { "power": false },
//!                   "fields": { "temp": true },
//!                   "saved_at": "2024-05-01T10:00:00+02:00" } }
//! ```

use crate::fields::EnabledStates;
use chrono::Local;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// State saved at the last exit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastState {
    /// Fieldspec the states belong to; `None` when running without one
    pub fieldspec_path: Option<PathBuf>,
    #[serde(flatten)]
    pub states: EnabledStates,
    /// RFC 3339 local time of the save
    #[serde(default)]
    pub saved_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBlob {
    #[serde(default)]
    pub last_state: Option<LastState>,
}

/// JSON file holding the [`StateBlob`]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store at `dirs::data_dir()/splotty/state.json`
    pub fn open_default() -> Result<Self, PersistError> {
        let dir = dirs::data_dir().ok_or(PersistError::NoDataDir)?;
        Ok(Self::new(dir.join("splotty").join("state.json")))
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the blob; a missing file is an empty blob.
    pub fn load(&self) -> Result<StateBlob, PersistError> {
        if !self.path.exists() {
            return Ok(StateBlob::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the blob through a temporary file and rename.
    pub fn save(&self, blob: &StateBlob) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(blob)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("saved state to {}", self.path.display());
        Ok(())
    }

    /// Saved states if they were written for the same fieldspec.
    ///
    /// An unreadable blob is logged and treated as absent.
    pub fn restore_for(&self, fieldspec_path: Option<&Path>) -> Option<EnabledStates> {
        let blob = match self.load() {
            Ok(blob) => blob,
            Err(e) => {
                warn!("ignoring saved state in {}: {}", self.path.display(), e);
                return None;
            }
        };
        let last = blob.last_state?;
        if last.fieldspec_path.as_deref() != fieldspec_path {
            debug!("saved state belongs to another fieldspec");
            return None;
        }
        Some(last.states)
    }

    /// Replace the saved state with `states`, stamped with the current time.
    pub fn record(
        &self,
        fieldspec_path: Option<&Path>,
        states: EnabledStates,
    ) -> Result<(), PersistError> {
        let blob = StateBlob {
            last_state: Some(LastState {
                fieldspec_path: fieldspec_path.map(Path::to_path_buf),
                states,
                saved_at: Local::now().to_rfc3339(),
            }),
        };
        self.save(&blob)
    }
}
