use crate::roles::{Operation, Role};
use std::fmt;

/// The kind of record an identifier refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    Visit,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Patient => f.write_str("patient"),
            RecordKind::Visit => f.write_str("visit"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("{kind} already exists: {id}")]
    DuplicateKey { kind: RecordKind, id: String },
    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // One variant for unknown users and wrong passwords.
    #[error("invalid username or password")]
    AuthFailure,
    #[error("role {role} is not permitted to {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl RecordError {
    pub(crate) fn patient_not_found(id: impl Into<String>) -> Self {
        RecordError::NotFound {
            kind: RecordKind::Patient,
            id: id.into(),
        }
    }

    pub(crate) fn visit_not_found(id: impl Into<String>) -> Self {
        RecordError::NotFound {
            kind: RecordKind::Visit,
            id: id.into(),
        }
    }
}

impl From<hms_types::TextError> for RecordError {
    fn from(err: hms_types::TextError) -> Self {
        RecordError::InvalidInput(err.to_string())
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
