//! Ledger persistence
//!
//! The ledger is saved as one JSON document holding both the status map and
//! the action history, so the two never drift apart on disk.

use super::{ActionLogEntry, CardId, CardStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Corrupt ledger file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-value image of the ledger, in its on-disk shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub card_states: BTreeMap<CardId, CardStatus>,
    #[serde(default)]
    pub card_action_history: Vec<ActionLogEntry>,
}

/// Backing store for the ledger.
///
/// Implementations replace the stored value as a whole on every save.
pub trait LedgerStore: Send + Sync {
    /// Read the stored ledger. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>, StoreError>;

    /// Replace the stored ledger with `snapshot`
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError>;
}

/// Ledger stored in a single JSON file.
///
/// Saves go to a sibling temp file that is then renamed over the target, so
/// a reader sees either the old or the new ledger. Writers in different
/// processes are not coordinated; the last rename wins.
///
/// Saves are blocking file I/O and run on the calling task while the ledger
/// lock is held. The file stays a few kilobytes, so each save is short, but
/// every session waits on it.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let bytes = encode_pretty(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, bytes).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.io_error(e)
        })
    }
}

/// JSON with 4-space indentation
fn encode_pretty(snapshot: &LedgerSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    snapshot.serialize(&mut serializer)?;
    Ok(out)
}
