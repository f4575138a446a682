//! Patient data loading.
//!
//! The patient data file is a header-bearing CSV with one visit (carrying one note) per row:
//!
//! ```text
//! Patient_ID,Gender,Race,Age,Ethnicity,Insurance,Zip_code,Visit_ID,Visit_time,Visit_department,Chief_complaint,Note_ID,Note_type
//! P1,F,White,34,Non-Hispanic,Medicaid,02115,V1,2020-03-01,ED,Fever,N1,Triage
//! ```
//!
//! Rows are deserialised into [`PatientRow`] and validated once into typed records. The first
//! row for a patient id creates the patient from that row's demographics; later rows only add
//! visits. A row repeating a visit id of the same patient adds its note to the existing visit
//! when its visit time, department and chief complaint match. Rows that fail validation, that
//! contradict an earlier row for the same visit, or that reuse a visit id owned by another
//! patient are skipped with a warning and counted in the [`LoadSummary`].

use crate::constants::PATIENT_DATA_COLUMNS;
use crate::error::RecordKind;
use crate::records::{Demographics, NoteRecord, PatientRecord, VisitRecord};
use crate::store::RecordStore;
use crate::validation::{parse_age, parse_visit_time};
use crate::{RecordError, RecordResult};
use hms_types::NonEmptyText;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One raw row of the patient data file.
#[derive(Clone, Debug, Deserialize)]
pub struct PatientRow {
    #[serde(rename = "Patient_ID")]
    pub patient_id: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Race")]
    pub race: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Ethnicity")]
    pub ethnicity: String,
    #[serde(rename = "Insurance")]
    pub insurance: String,
    #[serde(rename = "Zip_code")]
    pub zip_code: String,
    #[serde(rename = "Visit_ID")]
    pub visit_id: String,
    #[serde(rename = "Visit_time")]
    pub visit_time: String,
    #[serde(rename = "Visit_department")]
    pub department: String,
    #[serde(rename = "Chief_complaint")]
    pub chief_complaint: String,
    #[serde(rename = "Note_ID")]
    pub note_id: String,
    #[serde(rename = "Note_type")]
    pub note_type: String,
}

/// Typed records produced from a single row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRow {
    /// Patient without visits.
    pub patient: PatientRecord,
    /// Visit without notes.
    pub visit: VisitRecord,
    pub note: NoteRecord,
}

impl PatientRow {
    /// Coerces every field into its typed form.
    pub fn validate(self) -> RecordResult<ValidatedRow> {
        let demographics = Demographics {
            age: parse_age(&self.age)?,
            gender: self.gender,
            race: self.race,
            ethnicity: self.ethnicity,
            insurance: self.insurance,
            zip_code: self.zip_code,
        };

        Ok(ValidatedRow {
            patient: PatientRecord::new(NonEmptyText::new(&self.patient_id)?, demographics),
            visit: VisitRecord::new(
                NonEmptyText::new(&self.visit_id)?,
                parse_visit_time(&self.visit_time)?,
                self.department,
                self.chief_complaint,
            ),
            note: NoteRecord::new(NonEmptyText::new(&self.note_id)?, self.note_type),
        })
    }
}

/// Counters reported after a load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Patients in the store after the load.
    pub patients: usize,
    /// Visits in the store after the load.
    pub visits: usize,
}

/// Loads the patient data file into `store`.
///
/// # Errors
///
/// - `RecordError::FileRead` if the file cannot be opened.
/// - `RecordError::InvalidInput` if the header lacks a required column.
/// - `RecordError::Csv` if the header cannot be read.
pub fn load_patient_data(path: &Path, store: &mut RecordStore) -> RecordResult<LoadSummary> {
    let file = File::open(path).map_err(|source| RecordError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let summary = load_patient_data_from_reader(file, store)?;

    tracing::info!(
        path = %path.display(),
        rows = summary.rows_read,
        skipped = summary.rows_skipped,
        patients = summary.patients,
        visits = summary.visits,
        "patient data loaded"
    );
    Ok(summary)
}

/// Loads patient data rows from any reader into `store`.
pub fn load_patient_data_from_reader(
    reader: impl Read,
    store: &mut RecordStore,
) -> RecordResult<LoadSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?;
    if let Some(missing) = PATIENT_DATA_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(RecordError::InvalidInput(format!(
            "patient data file is missing column {missing}"
        )));
    }

    let mut summary = LoadSummary::default();
    for (index, result) in csv_reader.deserialize::<PatientRow>().enumerate() {
        // Line 1 is the header.
        let line = index + 2;
        summary.rows_read += 1;

        let applied = result
            .map_err(RecordError::from)
            .and_then(PatientRow::validate)
            .and_then(|row| apply_row(store, row));

        if let Err(e) = applied {
            tracing::warn!(line, error = %e, "skipping patient data row");
            summary.rows_skipped += 1;
        }
    }

    summary.patients = store.len();
    summary.visits = store.visit_count();
    Ok(summary)
}

fn apply_row(store: &mut RecordStore, row: ValidatedRow) -> RecordResult<()> {
    let ValidatedRow {
        patient,
        mut visit,
        note,
    } = row;
    let patient_id = patient.patient_id.clone();

    // Resolve the visit owner before creating the patient so a rejected row adds nothing.
    let owner = store.visit_owner(visit.visit_id.as_str()).map(str::to_owned);
    match owner {
        Some(owner) if owner == patient_id.as_str() => {
            let stored = store
                .get_patient(patient_id.as_str())?
                .visit(visit.visit_id.as_str())
                .ok_or_else(|| RecordError::visit_not_found(visit.visit_id.as_str()))?;
            if !same_visit(stored, &visit) {
                return Err(RecordError::InvalidInput(format!(
                    "visit {} conflicts with an earlier row",
                    visit.visit_id
                )));
            }
            store.add_note(patient_id.as_str(), visit.visit_id.as_str(), note)
        }
        Some(_) => Err(RecordError::DuplicateKey {
            kind: RecordKind::Visit,
            id: visit.visit_id.into_inner(),
        }),
        None => {
            if !store.contains_patient(patient_id.as_str()) {
                store.add_patient(patient)?;
            }
            visit.notes.push(note);
            store.add_visit(patient_id.as_str(), visit)
        }
    }
}

/// A repeated visit row may only add a note when its visit details agree with the stored visit.
fn same_visit(stored: &VisitRecord, row: &VisitRecord) -> bool {
    stored.visit_time == row.visit_time
        && stored.department == row.department
        && stored.chief_complaint == row.chief_complaint
}
