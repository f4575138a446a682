//! Patient, visit and note entities.
//!
//! Ownership follows the record hierarchy: a [`PatientRecord`] owns its visits and a
//! [`VisitRecord`] owns its notes, so dropping a patient drops everything below it.

use chrono::{NaiveDate, NaiveDateTime};
use hms_types::NonEmptyText;

/// Demographic attributes of a patient.
///
/// All values are opaque strings except `age`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Demographics {
    pub gender: String,
    pub race: String,
    pub age: u32,
    pub ethnicity: String,
    pub insurance: String,
    pub zip_code: String,
}

/// A patient and the visits recorded for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub patient_id: NonEmptyText,
    pub demographics: Demographics,

    /// Visits in the order they were added. Not sorted by date.
    pub visits: Vec<VisitRecord>,
}

impl PatientRecord {
    /// Creates a patient with no visits.
    pub fn new(patient_id: NonEmptyText, demographics: Demographics) -> Self {
        Self {
            patient_id,
            demographics,
            visits: Vec::new(),
        }
    }

    /// Looks up one of this patient's visits.
    pub fn visit(&self, visit_id: &str) -> Option<&VisitRecord> {
        self.visits.iter().find(|v| v.visit_id.as_str() == visit_id)
    }

    pub(crate) fn visit_mut(&mut self, visit_id: &str) -> Option<&mut VisitRecord> {
        self.visits
            .iter_mut()
            .find(|v| v.visit_id.as_str() == visit_id)
    }
}

/// A single hospital visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitRecord {
    pub visit_id: NonEmptyText,

    /// When the visit happened. Only the calendar day takes part in date queries.
    pub visit_time: NaiveDateTime,
    pub department: String,
    pub chief_complaint: String,
    pub notes: Vec<NoteRecord>,
}

impl VisitRecord {
    /// Creates a visit with no notes.
    pub fn new(
        visit_id: NonEmptyText,
        visit_time: NaiveDateTime,
        department: impl Into<String>,
        chief_complaint: impl Into<String>,
    ) -> Self {
        Self {
            visit_id,
            visit_time,
            department: department.into(),
            chief_complaint: chief_complaint.into(),
            notes: Vec::new(),
        }
    }

    /// Calendar day of the visit.
    pub fn visit_date(&self) -> NaiveDate {
        self.visit_time.date()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteRecord {
    pub note_id: NonEmptyText,
    pub note_type: String,
}

impl NoteRecord {
    pub fn new(note_id: NonEmptyText, note_type: impl Into<String>) -> Self {
        Self {
            note_id,
            note_type: note_type.into(),
        }
    }
}
