//! In-memory record store.
//!
//! [`RecordStore`] is the single owner of the patient → visit → note hierarchy for the lifetime
//! of the process. Nothing is persisted: the store is filled by the loaders at startup and every
//! change made during a session is lost when the process exits.
//!
//! ## Invariants
//!
//! - Patient ids are unique keys.
//! - Visit ids are unique across the whole store, not just within a patient.
//! - The date index holds, for every calendar day, exactly the number of stored visits on that
//!   day. It is updated on every insert and on cascade removal, so
//!   [`RecordStore::count_visits_on_date`] never scans.
//!
//! The store is role-agnostic. Access control happens in [`crate::session::Session`].

use crate::error::{RecordError, RecordKind, RecordResult};
use crate::records::{NoteRecord, PatientRecord, VisitRecord};
use crate::statistics::KeyStatistics;
use chrono::NaiveDate;
use hms_types::NonEmptyText;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Secondary indexes over every visit in the store.
#[derive(Debug, Default)]
struct VisitIndex {
    /// visit id → owning patient id
    owners: HashMap<NonEmptyText, NonEmptyText>,
    by_date: BTreeMap<NaiveDate, usize>,
}

impl VisitIndex {
    fn insert(&mut self, patient_id: &NonEmptyText, visit: &VisitRecord) {
        self.owners.insert(visit.visit_id.clone(), patient_id.clone());
        *self.by_date.entry(visit.visit_date()).or_insert(0) += 1;
    }

    fn remove(&mut self, visit: &VisitRecord) {
        self.owners.remove(visit.visit_id.as_str());
        if let Entry::Occupied(mut entry) = self.by_date.entry(visit.visit_date()) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }

    fn len(&self) -> usize {
        self.owners.len()
    }
}

/// Owner of all patient records.
#[derive(Debug, Default)]
pub struct RecordStore {
    patients: BTreeMap<NonEmptyText, PatientRecord>,
    visits: VisitIndex,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Total number of visits across all patients.
    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    pub fn contains_patient(&self, patient_id: &str) -> bool {
        self.patients.contains_key(patient_id)
    }

    /// Returns the id of the patient owning `visit_id`, if any.
    pub fn visit_owner(&self, visit_id: &str) -> Option<&str> {
        self.visits.owners.get(visit_id).map(NonEmptyText::as_str)
    }

    /// Iterates over all patients in patient id order.
    pub fn patients(&self) -> impl Iterator<Item = &PatientRecord> {
        self.patients.values()
    }

    /// Inserts a new patient.
    ///
    /// Visits already attached to `record` are indexed along with it.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::DuplicateKey` if:
    /// - the patient id is already present,
    /// - any attached visit id is already present in the store or repeated within `record`.
    ///
    /// Nothing is inserted on error.
    pub fn add_patient(&mut self, record: PatientRecord) -> RecordResult<()> {
        if self.patients.contains_key(record.patient_id.as_str()) {
            return Err(RecordError::DuplicateKey {
                kind: RecordKind::Patient,
                id: record.patient_id.into_inner(),
            });
        }

        let mut seen = HashSet::new();
        for visit in &record.visits {
            let id = visit.visit_id.as_str();
            if self.visits.owners.contains_key(id) || !seen.insert(id) {
                return Err(duplicate_visit(id));
            }
        }

        for visit in &record.visits {
            self.visits.insert(&record.patient_id, visit);
        }
        tracing::debug!(patient_id = %record.patient_id, "patient added");
        self.patients.insert(record.patient_id.clone(), record);
        Ok(())
    }

    /// Removes a patient together with all of its visits and notes.
    ///
    /// Returns the removed record. Its visit ids become free for reuse.
    pub fn remove_patient(&mut self, patient_id: &str) -> RecordResult<PatientRecord> {
        let record = self
            .patients
            .remove(patient_id)
            .ok_or_else(|| RecordError::patient_not_found(patient_id))?;

        for visit in &record.visits {
            self.visits.remove(visit);
        }
        tracing::debug!(patient_id, visits = record.visits.len(), "patient removed");
        Ok(record)
    }

    pub fn get_patient(&self, patient_id: &str) -> RecordResult<&PatientRecord> {
        self.patients
            .get(patient_id)
            .ok_or_else(|| RecordError::patient_not_found(patient_id))
    }

    /// Appends a visit to a patient's visit sequence.
    ///
    /// # Errors
    ///
    /// - `RecordError::NotFound` if the patient is absent.
    /// - `RecordError::DuplicateKey` if the visit id already exists anywhere in the store.
    pub fn add_visit(&mut self, patient_id: &str, visit: VisitRecord) -> RecordResult<()> {
        let patient = self
            .patients
            .get_mut(patient_id)
            .ok_or_else(|| RecordError::patient_not_found(patient_id))?;

        if self.visits.owners.contains_key(visit.visit_id.as_str()) {
            return Err(duplicate_visit(visit.visit_id.as_str()));
        }

        self.visits.insert(&patient.patient_id, &visit);
        patient.visits.push(visit);
        Ok(())
    }

    /// Appends a note to one of a patient's visits.
    ///
    /// A visit that exists but belongs to a different patient is reported as not found.
    pub fn add_note(
        &mut self,
        patient_id: &str,
        visit_id: &str,
        note: NoteRecord,
    ) -> RecordResult<()> {
        let patient = self
            .patients
            .get_mut(patient_id)
            .ok_or_else(|| RecordError::patient_not_found(patient_id))?;
        let visit = patient
            .visit_mut(visit_id)
            .ok_or_else(|| RecordError::visit_not_found(visit_id))?;

        visit.notes.push(note);
        Ok(())
    }

    /// Counts visits on the given calendar day, ignoring time of day.
    pub fn count_visits_on_date(&self, date: NaiveDate) -> usize {
        self.visits.by_date.get(&date).copied().unwrap_or(0)
    }

    /// Aggregates demographic and insurance counts over all current patients.
    pub fn aggregate_statistics(&self) -> KeyStatistics {
        KeyStatistics::from_patients(self.patients.values())
    }
}

fn duplicate_visit(visit_id: &str) -> RecordError {
    RecordError::DuplicateKey {
        kind: RecordKind::Visit,
        id: visit_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Demographics;
    use crate::validation::parse_visit_time;
    use chrono::NaiveTime;

    fn id(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn test_patient(patient_id: &str, insurance: &str) -> PatientRecord {
        PatientRecord::new(
            id(patient_id),
            Demographics {
                gender: "F".into(),
                race: "Asian".into(),
                age: 52,
                ethnicity: "Non-Hispanic".into(),
                insurance: insurance.into(),
                zip_code: "02139".into(),
            },
        )
    }

    fn test_visit(visit_id: &str, day: &str) -> VisitRecord {
        VisitRecord::new(
            id(visit_id),
            parse_visit_time(day).unwrap(),
            "Cardiology",
            "Chest pain",
        )
    }

    fn scan_count(store: &RecordStore, day: NaiveDate) -> usize {
        store
            .patients()
            .flat_map(|p| p.visits.iter())
            .filter(|v| v.visit_time.date() == day)
            .count()
    }

    /// Two visits for P1 on consecutive days, one visit for P2 on the first day.
    fn scenario_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1", "A")).unwrap();
        store.add_patient(test_patient("P2", "B")).unwrap();
        store.add_visit("P1", test_visit("V1", "2020-03-01")).unwrap();
        store.add_visit("P1", test_visit("V2", "2020-03-02")).unwrap();
        store.add_visit("P2", test_visit("V3", "2020-03-01")).unwrap();
        store
    }

    #[test]
    fn test_add_then_get_returns_equivalent_record() {
        let mut store = RecordStore::new();
        let patient = test_patient("P1", "Medicare");

        store
            .add_patient(patient.clone())
            .expect("add_patient should succeed");

        let fetched = store.get_patient("P1").expect("get_patient should succeed");
        assert_eq!(fetched, &patient);
        assert!(fetched.visits.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_patient_rejects_duplicate_id() {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1", "A")).unwrap();

        let err = store
            .add_patient(test_patient("P1", "B"))
            .expect_err("duplicate add should fail");

        assert!(matches!(
            err,
            RecordError::DuplicateKey {
                kind: RecordKind::Patient,
                ..
            }
        ));
        assert_eq!(store.get_patient("P1").unwrap().demographics.insurance, "A");
    }

    #[test]
    fn test_add_patient_indexes_attached_visits() {
        let mut store = RecordStore::new();
        let mut patient = test_patient("P1", "A");
        patient.visits.push(test_visit("V1", "2020-03-01"));
        patient.visits.push(test_visit("V2", "2020-03-01"));

        store.add_patient(patient).expect("add_patient should succeed");

        assert_eq!(store.count_visits_on_date(date("2020-03-01")), 2);
        assert_eq!(store.visit_owner("V2"), Some("P1"));
    }

    #[test]
    fn test_add_patient_with_conflicting_visit_inserts_nothing() {
        let mut store = scenario_store();
        let mut patient = test_patient("P3", "A");
        patient.visits.push(test_visit("V9", "2020-03-05"));
        patient.visits.push(test_visit("V1", "2020-03-05"));

        let err = store.add_patient(patient).expect_err("should fail");

        assert!(matches!(
            err,
            RecordError::DuplicateKey {
                kind: RecordKind::Visit,
                ..
            }
        ));
        assert!(!store.contains_patient("P3"));
        assert_eq!(store.visit_owner("V9"), None);
        assert_eq!(store.count_visits_on_date(date("2020-03-05")), 0);
    }

    #[test]
    fn test_get_patient_not_found() {
        let store = RecordStore::new();
        let err = store.get_patient("missing").expect_err("should fail");
        assert!(matches!(
            err,
            RecordError::NotFound {
                kind: RecordKind::Patient,
                ..
            }
        ));
    }

    #[test]
    fn test_add_visit_preserves_insertion_order() {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1", "A")).unwrap();

        // Deliberately out of date order.
        let days = ["2020-05-03", "2019-01-01", "2020-05-03", "2021-07-14"];
        for (n, day) in days.iter().enumerate() {
            store
                .add_visit("P1", test_visit(&format!("V{n}"), day))
                .expect("add_visit should succeed");
        }

        let visits = &store.get_patient("P1").unwrap().visits;
        assert_eq!(visits.len(), days.len());
        let ids: Vec<&str> = visits.iter().map(|v| v.visit_id.as_str()).collect();
        assert_eq!(ids, ["V0", "V1", "V2", "V3"]);
    }

    #[test]
    fn test_add_visit_unknown_patient() {
        let mut store = RecordStore::new();
        let err = store
            .add_visit("P404", test_visit("V1", "2020-03-01"))
            .expect_err("should fail");
        assert!(matches!(err, RecordError::NotFound { .. }));
        assert_eq!(store.visit_count(), 0);
    }

    #[test]
    fn test_add_visit_rejects_visit_id_owned_by_other_patient() {
        let mut store = scenario_store();
        let err = store
            .add_visit("P2", test_visit("V1", "2020-04-01"))
            .expect_err("should fail");

        assert!(matches!(
            err,
            RecordError::DuplicateKey {
                kind: RecordKind::Visit,
                ..
            }
        ));
        assert_eq!(store.get_patient("P2").unwrap().visits.len(), 1);
        assert_eq!(store.count_visits_on_date(date("2020-04-01")), 0);
    }

    #[test]
    fn test_add_note_appends_to_visit() {
        let mut store = scenario_store();

        store
            .add_note("P1", "V2", NoteRecord::new(id("N1"), "Progress"))
            .expect("add_note should succeed");
        store
            .add_note("P1", "V2", NoteRecord::new(id("N2"), "Discharge"))
            .expect("add_note should succeed");

        let visit = store.get_patient("P1").unwrap().visit("V2").unwrap();
        let types: Vec<&str> = visit.notes.iter().map(|n| n.note_type.as_str()).collect();
        assert_eq!(types, ["Progress", "Discharge"]);
    }

    #[test]
    fn test_add_note_missing_patient_or_visit() {
        let mut store = scenario_store();

        let err = store
            .add_note("P9", "V1", NoteRecord::new(id("N1"), "Progress"))
            .expect_err("should fail");
        assert!(matches!(
            err,
            RecordError::NotFound {
                kind: RecordKind::Patient,
                ..
            }
        ));

        // V3 exists, but belongs to P2.
        let err = store
            .add_note("P1", "V3", NoteRecord::new(id("N1"), "Progress"))
            .expect_err("should fail");
        assert!(matches!(
            err,
            RecordError::NotFound {
                kind: RecordKind::Visit,
                ..
            }
        ));
    }

    #[test]
    fn test_count_visits_on_date_scenario() {
        let store = scenario_store();

        assert_eq!(store.count_visits_on_date(date("2020-03-01")), 2);
        assert_eq!(store.count_visits_on_date(date("2020-03-02")), 1);
        assert_eq!(store.count_visits_on_date(date("2020-03-03")), 0);
    }

    #[test]
    fn test_count_visits_on_empty_store() {
        let store = RecordStore::new();
        assert_eq!(store.count_visits_on_date(date("2020-03-01")), 0);
    }

    #[test]
    fn test_count_visits_ignores_time_of_day() {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1", "A")).unwrap();

        let day = date("2022-08-09");
        let times = [
            NaiveTime::MIN,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        ];
        for (n, time) in times.into_iter().enumerate() {
            let visit = VisitRecord::new(id(&format!("V{n}")), day.and_time(time), "ED", "Fall");
            store.add_visit("P1", visit).unwrap();
        }

        assert_eq!(store.count_visits_on_date(day), 3);
        assert_eq!(store.count_visits_on_date(date("2022-08-10")), 0);
    }

    #[test]
    fn test_remove_patient_cascades() {
        let mut store = scenario_store();
        store
            .add_note("P1", "V1", NoteRecord::new(id("N1"), "Progress"))
            .unwrap();

        let removed = store
            .remove_patient("P1")
            .expect("remove_patient should succeed");

        assert_eq!(removed.visits.len(), 2);
        assert!(!store.contains_patient("P1"));
        assert_eq!(store.visit_owner("V1"), None);
        assert_eq!(store.visit_owner("V2"), None);
        assert_eq!(store.visit_count(), 1);
        assert_eq!(store.count_visits_on_date(date("2020-03-01")), 1);
        assert_eq!(store.count_visits_on_date(date("2020-03-02")), 0);
        assert!(store
            .patients()
            .flat_map(|p| p.visits.iter())
            .flat_map(|v| v.notes.iter())
            .all(|n| n.note_id.as_str() != "N1"));
    }

    #[test]
    fn test_removed_visit_ids_can_be_reused() {
        let mut store = scenario_store();
        store.remove_patient("P2").unwrap();

        store
            .add_visit("P1", test_visit("V3", "2020-03-09"))
            .expect("V3 should be free after cascade removal");
        assert_eq!(store.visit_owner("V3"), Some("P1"));
    }

    #[test]
    fn test_remove_patient_not_found() {
        let mut store = scenario_store();
        let err = store.remove_patient("P3").expect_err("should fail");
        assert!(matches!(err, RecordError::NotFound { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_date_index_matches_full_scan() {
        let mut store = RecordStore::new();
        let days = ["2020-01-01", "2020-01-02", "2020-01-03"];

        for p in 0..6 {
            store
                .add_patient(test_patient(&format!("P{p}"), "A"))
                .unwrap();
            for v in 0..=p {
                let day = days[(p + v) % days.len()];
                store
                    .add_visit(&format!("P{p}"), test_visit(&format!("V{p}-{v}"), day))
                    .unwrap();
            }
        }
        store.remove_patient("P2").unwrap();
        store.remove_patient("P5").unwrap();
        store
            .add_visit("P0", test_visit("V-late", "2020-01-02"))
            .unwrap();

        for day in days.iter().map(|d| date(d)) {
            assert_eq!(store.count_visits_on_date(day), scan_count(&store, day));
        }
        assert_eq!(
            store.visit_count(),
            store.patients().map(|p| p.visits.len()).sum::<usize>()
        );
    }

    #[test]
    fn test_aggregate_statistics_insurance() {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1", "A")).unwrap();
        store.add_patient(test_patient("P2", "A")).unwrap();
        store.add_patient(test_patient("P3", "B")).unwrap();

        let stats = store.aggregate_statistics();

        assert_eq!(stats.total_patients, 3);
        assert_eq!(
            stats.insurance,
            BTreeMap::from([("A".to_string(), 2), ("B".to_string(), 1)])
        );
    }
}
