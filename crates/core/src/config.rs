//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; nothing in the
//! core looks at the process environment while serving a call.

use crate::constants::{
    DEFAULT_DATA_DIR, DESCRIPTIONS_DIR_NAME, PATIENTS_DIR_NAME, QUESTIONS_FILENAME,
    RULES_FILENAME, SYMPTOM_LISTS_FILENAME, TREATMENTS_DIR_NAME,
};
use crate::{MedexError, MedexResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig` rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> MedexResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(MedexError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn rules_file(&self) -> PathBuf {
        self.data_dir.join(RULES_FILENAME)
    }

    pub fn symptom_lists_file(&self) -> PathBuf {
        self.data_dir.join(SYMPTOM_LISTS_FILENAME)
    }

    pub fn questions_file(&self) -> PathBuf {
        self.data_dir.join(QUESTIONS_FILENAME)
    }

    pub fn descriptions_dir(&self) -> PathBuf {
        self.data_dir.join(DESCRIPTIONS_DIR_NAME)
    }

    pub fn treatments_dir(&self) -> PathBuf {
        self.data_dir.join(TREATMENTS_DIR_NAME)
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }
}

/// Resolve the data directory from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
