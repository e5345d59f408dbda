use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::atomic_io::write_text_atomic;

use super::ledger::DiscoveryLedger;

pub const SAVE_VERSION: u32 = 1;
pub const LEDGER_FILE_NAME: &str = "ledger.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavedLedger {
    pub save_version: u32,
    pub total_score: u64,
    pub entries: BTreeMap<String, u32>,
}

impl SavedLedger {
    pub fn from_ledger(ledger: &DiscoveryLedger) -> Self {
        Self {
            save_version: SAVE_VERSION,
            total_score: ledger.total_score(),
            entries: ledger
                .entries()
                .map(|(key, count)| (key.to_string(), count))
                .collect(),
        }
    }

    pub fn into_ledger(self) -> DiscoveryLedger {
        DiscoveryLedger::from_parts(self.entries, self.total_score)
    }
}

#[derive(Debug, Error)]
pub enum LedgerSaveError {
    #[error("encode ledger json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("write ledger '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read ledger '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse ledger json at {field_path}: {source}")]
    Parse {
        field_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {field_path}: {message}")]
    Validation { field_path: String, message: String },
}

pub fn save_ledger(path: &Path, ledger: &DiscoveryLedger) -> Result<(), LedgerSaveError> {
    let saved = SavedLedger::from_ledger(ledger);
    let json = serde_json::to_string_pretty(&saved).map_err(LedgerSaveError::Encode)?;
    write_text_atomic(path, &json).map_err(|source| LedgerSaveError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        entry_count = saved.entries.len(),
        total_score = saved.total_score,
        "ledger_saved"
    );
    Ok(())
}

/// Loads a saved ledger. A missing file is not an error and yields `None`.
pub fn load_ledger(path: &Path) -> Result<Option<DiscoveryLedger>, LedgerSaveError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LedgerSaveError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let saved = parse_saved_ledger(&raw)?;
    validate_saved_ledger(&saved)?;
    info!(
        path = %path.display(),
        entry_count = saved.entries.len(),
        total_score = saved.total_score,
        "ledger_loaded"
    );
    Ok(Some(saved.into_ledger()))
}

fn parse_saved_ledger(raw: &str) -> Result<SavedLedger, LedgerSaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SavedLedger>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        LedgerSaveError::Parse {
            field_path: if path.is_empty() { ".".to_string() } else { path },
            source: error.into_inner(),
        }
    })
}

fn validation_err(field_path: impl Into<String>, message: impl Into<String>) -> LedgerSaveError {
    LedgerSaveError::Validation {
        field_path: field_path.into(),
        message: message.into(),
    }
}

fn expected_actual(
    field_path: impl Into<String>,
    expected: impl Display,
    actual: impl Display,
) -> LedgerSaveError {
    validation_err(field_path, format!("expected {expected}, got {actual}"))
}

fn validate_saved_ledger(saved: &SavedLedger) -> Result<(), LedgerSaveError> {
    if saved.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            saved.save_version,
        ));
    }
    for (key, count) in &saved.entries {
        if key.trim().is_empty() {
            return Err(validation_err("entries", "species key must not be empty"));
        }
        if *count == 0 {
            return Err(expected_actual(format!("entries.{key}"), "count >= 1", count));
        }
    }
    Ok(())
}
