//! # HMS Core
//!
//! Core business logic for the HMS hospital records tool.
//!
//! This crate contains pure in-memory data operations:
//! - The patient → visit → note hierarchy held by [`RecordStore`]
//! - Date-based visit counts and demographic statistics
//! - Credential loading and authentication into a [`Role`]
//! - Role-gated dispatch through [`Session`]
//! - Loading the credential and patient data files
//!
//! **No UI concerns**: prompting, menus, and report rendering belong in `hms-cli`. Nothing here
//! writes to stdout, and nothing is ever written back to disk.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod loader;
pub mod records;
pub mod roles;
pub mod session;
pub mod statistics;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use credentials::{CredentialStore, UserProfile};
pub use error::{RecordError, RecordKind, RecordResult};
pub use loader::{load_patient_data, LoadSummary};
pub use records::{Demographics, NoteRecord, PatientRecord, VisitRecord};
pub use roles::{Operation, Role, SessionKind};
pub use session::Session;
pub use statistics::{DemographicCounts, KeyStatistics};
pub use store::RecordStore;

pub use hms_types::{NonEmptyText, TextError};
