//! Console rendering of patient records and statistics reports.

use clap::ValueEnum;
use hms_core::{KeyStatistics, PatientRecord};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{self, Write};

/// Output format for the key statistics report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

pub fn render_patient(out: &mut impl Write, patient: &PatientRecord) -> io::Result<()> {
    let d = &patient.demographics;
    writeln!(out, "Patient ID: {}", patient.patient_id)?;
    writeln!(out, "Gender: {}", d.gender)?;
    writeln!(out, "Race: {}", d.race)?;
    writeln!(out, "Age: {}", d.age)?;
    writeln!(out, "Ethnicity: {}", d.ethnicity)?;
    writeln!(out, "Insurance: {}", d.insurance)?;
    writeln!(out, "Zip code: {}", d.zip_code)?;
    writeln!(out, "Visit records:")?;
    for visit in &patient.visits {
        writeln!(out, "  Visit ID: {}", visit.visit_id)?;
        writeln!(out, "  Visit time: {}", visit.visit_time)?;
        writeln!(out, "  Department: {}", visit.department)?;
        writeln!(out, "  Chief complaint: {}", visit.chief_complaint)?;
        writeln!(out, "  Note records:")?;
        for note in &visit.notes {
            writeln!(out, "    Note ID: {}", note.note_id)?;
            writeln!(out, "    Note type: {}", note.note_type)?;
        }
    }
    Ok(())
}

pub fn render_statistics(
    out: &mut impl Write,
    stats: &KeyStatistics,
    format: ReportFormat,
) -> anyhow::Result<()> {
    match format {
        ReportFormat::Text => render_statistics_text(out, stats)?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, stats)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn render_statistics_text(out: &mut impl Write, stats: &KeyStatistics) -> io::Result<()> {
    writeln!(out, "Total patients: {}", stats.total_patients)?;

    writeln!(out)?;
    writeln!(
        out,
        "1. Temporal trend of the number of patients who visited the hospital with different \
         types of insurances:"
    )?;
    for (insurance, count) in &stats.insurance {
        writeln!(out, "   - Insurance: {insurance}, Number of patients: {count}")?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "2. Temporal trend of the number of patients who visited the hospital in different \
         demographics groups:"
    )?;
    let demographics = &stats.demographics;
    render_group(out, "age", &demographics.age)?;
    render_group(out, "race", &demographics.race)?;
    render_group(out, "gender", &demographics.gender)?;
    render_group(out, "ethnicity", &demographics.ethnicity)?;
    Ok(())
}

fn render_group<K: Display>(
    out: &mut impl Write,
    category: &str,
    counts: &BTreeMap<K, usize>,
) -> io::Result<()> {
    writeln!(out, "   - Demographic category: {category}")?;
    for (group, count) in counts {
        writeln!(out, "     - {group}: {count}")?;
    }
    Ok(())
}
