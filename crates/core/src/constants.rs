//! Constants used throughout the HMS core crate.
//!
//! Input formats are fixed by the files the tool is given, so the column names and date
//! format are kept here rather than spread over the loaders.

/// `chrono` format string for calendar dates in input files and at the prompt.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of comma-separated fields in a credential row (`username,password,role`).
pub const CREDENTIAL_FIELDS: usize = 3;

/// Default `tracing` filter directive when `RUST_LOG` is not set.
///
/// Logs go to stderr and the prompt is on stdout, so the default keeps routine events quiet.
pub const DEFAULT_LOG_DIRECTIVE: &str = "hms=warn";

/// Header columns expected in the patient data file.
pub const PATIENT_DATA_COLUMNS: [&str; 13] = [
    "Patient_ID",
    "Gender",
    "Race",
    "Age",
    "Ethnicity",
    "Insurance",
    "Zip_code",
    "Visit_ID",
    "Visit_time",
    "Visit_department",
    "Chief_complaint",
    "Note_ID",
    "Note_type",
];
