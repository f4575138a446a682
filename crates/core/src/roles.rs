//! User roles and the capability table.
//!
//! A role is resolved once at login. From then on, every operation is checked against
//! [`Role::permitted_operations`] before it reaches the record store.

use crate::{RecordError, RecordResult};
use std::fmt;
use std::str::FromStr;

/// The role of an authenticated user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Management,
    Clinician,
    Nurse,
}

/// Operations a session can dispatch to the record store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    AddPatient,
    RemovePatient,
    RetrievePatient,
    AddVisit,
    AddNote,
    CountVisits,
    AggregateStatistics,
}

/// How long a session for a given role lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionKind {
    /// One action, then the session ends.
    SingleAction,
    /// The statistics report is produced immediately, then the session ends.
    ReportOnly,
    /// Actions repeat until the user stops.
    Interactive,
}

const ADMIN_OPERATIONS: &[Operation] = &[Operation::CountVisits];

const MANAGEMENT_OPERATIONS: &[Operation] = &[Operation::AggregateStatistics];

const CARE_OPERATIONS: &[Operation] = &[
    Operation::AddPatient,
    Operation::RemovePatient,
    Operation::RetrievePatient,
    Operation::AddVisit,
    Operation::AddNote,
    Operation::CountVisits,
];

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Management, Role::Clinician, Role::Nurse];

    pub fn permitted_operations(self) -> &'static [Operation] {
        match self {
            Role::Admin => ADMIN_OPERATIONS,
            Role::Management => MANAGEMENT_OPERATIONS,
            Role::Clinician | Role::Nurse => CARE_OPERATIONS,
        }
    }

    pub fn can(self, operation: Operation) -> bool {
        self.permitted_operations().contains(&operation)
    }

    pub fn session_kind(self) -> SessionKind {
        match self {
            Role::Admin => SessionKind::SingleAction,
            Role::Management => SessionKind::ReportOnly,
            Role::Clinician | Role::Nurse => SessionKind::Interactive,
        }
    }

    /// Lower-case name as it appears in the credential file.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Management => "management",
            Role::Clinician => "clinician",
            Role::Nurse => "nurse",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RecordError;

    /// Parses a role name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> RecordResult<Self> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RecordError::InvalidInput(format!("unknown role: {wanted:?}")))
    }
}

impl Operation {
    /// Action word used at the prompt.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::AddPatient => "add_patient",
            Operation::RemovePatient => "remove_patient",
            Operation::RetrievePatient => "retrieve_patient",
            Operation::AddVisit => "add_visit",
            Operation::AddNote => "add_note",
            Operation::CountVisits => "count_visits",
            Operation::AggregateStatistics => "generate_statistics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
