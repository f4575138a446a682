//! Core runtime configuration.
//!
//! The two input files are resolved once at process startup and validated before anything is
//! loaded, so a missing file aborts the program before any session begins.

use crate::{RecordError, RecordResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    credentials_path: PathBuf,
    patient_data_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - `RecordError::FileRead` if either path cannot be inspected (usually: it does not exist).
    /// - `RecordError::InvalidInput` if either path is not a regular file.
    pub fn new(credentials_path: PathBuf, patient_data_path: PathBuf) -> RecordResult<Self> {
        ensure_regular_file(&credentials_path)?;
        ensure_regular_file(&patient_data_path)?;

        Ok(Self {
            credentials_path,
            patient_data_path,
        })
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn patient_data_path(&self) -> &Path {
        &self.patient_data_path
    }
}

fn ensure_regular_file(path: &Path) -> RecordResult<()> {
    let metadata = std::fs::metadata(path).map_err(|source| RecordError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(RecordError::InvalidInput(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(())
}
