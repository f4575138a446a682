//! Role-gated access to the record store.
//!
//! A [`Session`] binds an authenticated [`UserProfile`] to the store for the duration of one
//! login. Each method checks the role's capability table first; a refused operation returns
//! [`RecordError::Forbidden`] and never reaches the store.

use crate::credentials::UserProfile;
use crate::records::{NoteRecord, PatientRecord, VisitRecord};
use crate::roles::{Operation, Role};
use crate::statistics::KeyStatistics;
use crate::store::RecordStore;
use crate::{RecordError, RecordKind, RecordResult};
use chrono::NaiveDate;

pub struct Session<'a> {
    profile: &'a UserProfile,
    store: &'a mut RecordStore,
}

impl<'a> Session<'a> {
    pub fn new(profile: &'a UserProfile, store: &'a mut RecordStore) -> Self {
        Self { profile, store }
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    fn authorise(&self, operation: Operation) -> RecordResult<()> {
        let role = self.profile.role;
        if !role.can(operation) {
            tracing::warn!(
                username = %self.profile.username,
                %role,
                %operation,
                "operation refused"
            );
            return Err(RecordError::Forbidden { role, operation });
        }

        tracing::debug!(username = %self.profile.username, %operation, "dispatch");
        Ok(())
    }

    /// Fails with `DuplicateKey` if `patient_id` is taken.
    ///
    /// Lets a caller reject an id before collecting the rest of a new patient's details.
    pub fn check_new_patient_id(&self, patient_id: &str) -> RecordResult<()> {
        self.authorise(Operation::AddPatient)?;
        if self.store.contains_patient(patient_id) {
            return Err(RecordError::DuplicateKey {
                kind: RecordKind::Patient,
                id: patient_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_patient(&mut self, record: PatientRecord) -> RecordResult<()> {
        self.authorise(Operation::AddPatient)?;
        self.store.add_patient(record)
    }

    pub fn remove_patient(&mut self, patient_id: &str) -> RecordResult<PatientRecord> {
        self.authorise(Operation::RemovePatient)?;
        self.store.remove_patient(patient_id)
    }

    pub fn retrieve_patient(&self, patient_id: &str) -> RecordResult<&PatientRecord> {
        self.authorise(Operation::RetrievePatient)?;
        self.store.get_patient(patient_id)
    }

    pub fn add_visit(&mut self, patient_id: &str, visit: VisitRecord) -> RecordResult<()> {
        self.authorise(Operation::AddVisit)?;
        self.store.add_visit(patient_id, visit)
    }

    pub fn add_note(
        &mut self,
        patient_id: &str,
        visit_id: &str,
        note: NoteRecord,
    ) -> RecordResult<()> {
        self.authorise(Operation::AddNote)?;
        self.store.add_note(patient_id, visit_id, note)
    }

    pub fn count_visits_on_date(&self, date: NaiveDate) -> RecordResult<usize> {
        self.authorise(Operation::CountVisits)?;
        Ok(self.store.count_visits_on_date(date))
    }

    pub fn aggregate_statistics(&self) -> RecordResult<KeyStatistics> {
        self.authorise(Operation::AggregateStatistics)?;
        Ok(self.store.aggregate_statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Demographics;
    use crate::validation::parse_visit_time;
    use hms_types::NonEmptyText;

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            username: format!("{role}-user"),
            role,
        }
    }

    fn test_patient(patient_id: &str) -> PatientRecord {
        PatientRecord::new(
            NonEmptyText::new(patient_id).unwrap(),
            Demographics {
                gender: "M".into(),
                race: "White".into(),
                age: 70,
                ethnicity: "Non-Hispanic".into(),
                insurance: "Medicare".into(),
                zip_code: "02118".into(),
            },
        )
    }

    fn seeded_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.add_patient(test_patient("P1")).unwrap();
        store
            .add_visit(
                "P1",
                VisitRecord::new(
                    NonEmptyText::new("V1").unwrap(),
                    parse_visit_time("2020-03-01").unwrap(),
                    "ED",
                    "Fever",
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_admin_add_patient_is_refused_without_touching_store() {
        let mut store = seeded_store();
        let admin = profile(Role::Admin);
        let mut session = Session::new(&admin, &mut store);

        let err = session
            .add_patient(test_patient("P2"))
            .expect_err("admin must not add patients");

        assert!(matches!(
            err,
            RecordError::Forbidden {
                role: Role::Admin,
                operation: Operation::AddPatient
            }
        ));
        assert!(!store.contains_patient("P2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_admin_can_count_visits() {
        let mut store = seeded_store();
        let admin = profile(Role::Admin);
        let session = Session::new(&admin, &mut store);

        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(session.count_visits_on_date(date).unwrap(), 1);
        assert!(session.aggregate_statistics().is_err());
        assert!(session.retrieve_patient("P1").is_err());
    }

    #[test]
    fn test_management_only_aggregates() {
        let mut store = seeded_store();
        let management = profile(Role::Management);
        let mut session = Session::new(&management, &mut store);

        let stats = session
            .aggregate_statistics()
            .expect("aggregate_statistics should succeed");
        assert_eq!(stats.total_patients, 1);

        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert!(matches!(
            session.count_visits_on_date(date),
            Err(RecordError::Forbidden { .. })
        ));
        assert!(matches!(
            session.remove_patient("P1"),
            Err(RecordError::Forbidden { .. })
        ));
        assert!(store.contains_patient("P1"));
    }

    #[test]
    fn test_nurse_session_mutates_store() {
        let mut store = seeded_store();
        let nurse = profile(Role::Nurse);
        let mut session = Session::new(&nurse, &mut store);

        session
            .check_new_patient_id("P2")
            .expect("P2 should be free");
        assert!(matches!(
            session.check_new_patient_id("P1"),
            Err(RecordError::DuplicateKey { .. })
        ));

        session.add_patient(test_patient("P2")).unwrap();
        session
            .add_note(
                "P1",
                "V1",
                NoteRecord::new(NonEmptyText::new("N1").unwrap(), "Progress"),
            )
            .unwrap();
        session.remove_patient("P1").unwrap();

        assert!(session.retrieve_patient("P2").is_ok());
        assert!(matches!(
            session.retrieve_patient("P1"),
            Err(RecordError::NotFound { .. })
        ));
    }
}
