//! Key statistics over the patients currently held in the store.
//!
//! The report is a plain data transfer object. Rendering it (text table, JSON) is left to the
//! caller.

use crate::records::PatientRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Patient counts per demographic attribute value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DemographicCounts {
    pub age: BTreeMap<u32, usize>,
    pub race: BTreeMap<String, usize>,
    pub gender: BTreeMap<String, usize>,
    pub ethnicity: BTreeMap<String, usize>,
}

/// Aggregate patient counts.
///
/// Every grouping maps an attribute value to the number of patients carrying it. Values no
/// patient carries do not appear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeyStatistics {
    pub total_patients: usize,
    pub insurance: BTreeMap<String, usize>,
    pub demographics: DemographicCounts,
}

impl KeyStatistics {
    /// Aggregates over the given patients.
    ///
    /// Each patient is counted once per grouping, regardless of how many visits it has.
    pub fn from_patients<'a>(patients: impl IntoIterator<Item = &'a PatientRecord>) -> Self {
        let mut stats = KeyStatistics::default();

        for patient in patients {
            let d = &patient.demographics;
            stats.total_patients += 1;
            bump(&mut stats.insurance, d.insurance.clone());
            bump(&mut stats.demographics.age, d.age);
            bump(&mut stats.demographics.race, d.race.clone());
            bump(&mut stats.demographics.gender, d.gender.clone());
            bump(&mut stats.demographics.ethnicity, d.ethnicity.clone());
        }

        stats
    }
}

fn bump<K: Ord>(counts: &mut BTreeMap<K, usize>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}
