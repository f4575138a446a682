//! Credential loading and authentication.
//!
//! The credential file has one `username,password,role` row per user and no header. It is read
//! completely before any login attempt. A later row for the same username replaces the earlier
//! one.
//!
//! Authentication never reveals whether a username exists: an unknown user and a wrong
//! password both produce [`RecordError::AuthFailure`].

use crate::constants::CREDENTIAL_FIELDS;
use crate::roles::Role;
use crate::{RecordError, RecordResult};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use subtle::ConstantTimeEq;

const UNKNOWN_USER_PASSWORD: &str = "\u{0}unknown-user\u{0}";

struct Credential {
    password: String,
    role: Role,
}

/// An authenticated user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub role: Role,
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Username: {}, Role: {}", self.username, self.role)
    }
}

/// In-memory table of user credentials.
#[derive(Default)]
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("users", &self.credentials.len())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Loads credentials from a file.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::FileRead` if the file cannot be opened. Malformed or unreadable rows
    /// are skipped with a warning.
    pub fn load(path: &Path) -> RecordResult<Self> {
        let file = File::open(path).map_err(|source| RecordError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_reader(file);
        if store.is_empty() {
            tracing::warn!(path = %path.display(), "credential file has no usable rows");
        } else {
            tracing::info!(path = %path.display(), users = store.len(), "credentials loaded");
        }
        Ok(store)
    }

    /// Reads credential rows from any reader.
    pub fn from_reader(reader: impl Read) -> Self {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut store = Self::default();
        for (index, result) in csv_reader.records().enumerate() {
            let line = index + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping unreadable credential row");
                    continue;
                }
            };

            if record.len() != CREDENTIAL_FIELDS {
                tracing::warn!(line, fields = record.len(), "skipping malformed credential row");
                continue;
            }

            let role = match record[2].parse::<Role>() {
                Ok(role) => role,
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping credential row");
                    continue;
                }
            };

            store.insert(&record[0], &record[1], role);
        }

        store
    }

    /// Adds or replaces a user.
    pub fn insert(&mut self, username: &str, password: &str, role: Role) {
        let previous = self.credentials.insert(
            username.to_string(),
            Credential {
                password: password.to_string(),
                role,
            },
        );
        if previous.is_some() {
            tracing::debug!(username, "credential replaced by later row");
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Resolves a username/password pair into a profile.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::AuthFailure` for an unknown username or a wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> RecordResult<UserProfile> {
        // An unknown user is still compared against a placeholder so both failures cost the same.
        let (stored, role) = match self.credentials.get(username) {
            Some(credential) => (credential.password.as_bytes(), Some(credential.role)),
            None => (UNKNOWN_USER_PASSWORD.as_bytes(), None),
        };
        let matches = bool::from(stored.ct_eq(password.as_bytes()));

        match role {
            Some(role) if matches => Ok(UserProfile {
                username: username.to_string(),
                role,
            }),
            _ => Err(RecordError::AuthFailure),
        }
    }
}
