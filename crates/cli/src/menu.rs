//! Login and the role-gated action menus.
//!
//! The set of actions offered to a user comes from the role's capability table, so a word the
//! role may not use is treated like any other unknown word. End of input behaves like `stop`.

use crate::console::Console;
use crate::report::{self, ReportFormat};
use hms_core::validation::{parse_age, parse_date, parse_visit_time};
use hms_core::{
    CredentialStore, Demographics, NonEmptyText, NoteRecord, Operation, PatientRecord,
    RecordError, RecordKind, RecordStore, Role, Session, SessionKind, UserProfile, VisitRecord,
};
use std::io::{BufRead, Write};

const STOP: &str = "stop";

/// How a run of the tool ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    AuthFailed,
}

/// Whether the session goes on after an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    End,
}

/// Reads an answer, or ends the session at end of input.
macro_rules! ask {
    ($console:expr, $label:expr) => {
        match $console.prompt($label)? {
            Some(answer) => answer,
            None => return Ok(Flow::End),
        }
    };
}

/// Logs a user in and runs the session their role allows.
pub fn run<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    credentials: &CredentialStore,
    store: &mut RecordStore,
    report_format: ReportFormat,
) -> anyhow::Result<RunOutcome> {
    let Some(profile) = login(console, credentials)? else {
        return Ok(RunOutcome::AuthFailed);
    };
    tracing::info!(username = %profile.username, role = %profile.role, "logged in");

    let mut session = Session::new(&profile, store);
    match profile.role.session_kind() {
        SessionKind::SingleAction => admin_session(console, &mut session, report_format)?,
        SessionKind::ReportOnly => management_session(console, &mut session, report_format)?,
        SessionKind::Interactive => care_session(console, &mut session, report_format)?,
    };
    Ok(RunOutcome::Completed)
}

fn login<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    credentials: &CredentialStore,
) -> anyhow::Result<Option<UserProfile>> {
    let username = console.prompt("Username: ")?.unwrap_or_default();
    let password = console.prompt("Password: ")?.unwrap_or_default();

    match credentials.authenticate(username.trim(), &password) {
        Ok(profile) => Ok(Some(profile)),
        Err(RecordError::AuthFailure) => {
            console.say("Invalid username or password.")?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn admin_session<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
    report_format: ReportFormat,
) -> anyhow::Result<Flow> {
    console.say("You are logged in as an admin.")?;
    console.say("You can only perform 'count_visits' action.")?;

    let word = ask!(console, &action_prompt(session.role()));
    match parse_action(session.role(), &word) {
        Action::Stop => console.say("Exiting program.")?,
        Action::Run(operation) => {
            dispatch(console, session, operation, report_format)?;
        }
        Action::Unknown => console.say("Invalid action. Exiting program.")?,
    }
    Ok(Flow::End)
}

fn management_session<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
    report_format: ReportFormat,
) -> anyhow::Result<Flow> {
    console.say("You are logged in as management.")?;
    dispatch(
        console,
        session,
        Operation::AggregateStatistics,
        report_format,
    )?;
    console.say("Statistics generated. Exiting program.")?;
    Ok(Flow::End)
}

fn care_session<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
    report_format: ReportFormat,
) -> anyhow::Result<Flow> {
    console.say("You are logged in as a clinician/nurse.")?;
    console.say("You can perform all actions.")?;

    let prompt = action_prompt(session.role());
    loop {
        let word = ask!(console, &prompt);
        match parse_action(session.role(), &word) {
            Action::Stop => {
                console.say("Exiting program.")?;
                return Ok(Flow::End);
            }
            Action::Run(operation) => {
                if dispatch(console, session, operation, report_format)? == Flow::End {
                    return Ok(Flow::End);
                }
            }
            Action::Unknown => console.say("Invalid action. Please try again.")?,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Run(Operation),
    Stop,
    Unknown,
}

fn parse_action(role: Role, word: &str) -> Action {
    let word = word.trim();
    if word.eq_ignore_ascii_case(STOP) {
        return Action::Stop;
    }
    role.permitted_operations()
        .iter()
        .find(|op| op.as_str().eq_ignore_ascii_case(word))
        .map_or(Action::Unknown, |op| Action::Run(*op))
}

/// Builds e.g. `Enter 'add_patient', 'count_visits', or 'stop': `.
fn action_prompt(role: Role) -> String {
    let mut words: Vec<String> = role
        .permitted_operations()
        .iter()
        .map(|op| format!("'{op}'"))
        .collect();
    let stop = format!("'{STOP}'");

    if words.len() == 1 {
        format!("Enter {} or {stop}: ", words[0])
    } else {
        words.push(format!("or {stop}"));
        format!("Enter {}: ", words.join(", "))
    }
}

/// Runs one action. Record errors are reported and the session goes on.
fn dispatch<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
    operation: Operation,
    report_format: ReportFormat,
) -> anyhow::Result<Flow> {
    let result = match operation {
        Operation::AddPatient => add_patient(console, session),
        Operation::RemovePatient => remove_patient(console, session),
        Operation::RetrievePatient => retrieve_patient(console, session),
        Operation::AddVisit => add_visit(console, session),
        Operation::AddNote => add_note(console, session),
        Operation::CountVisits => count_visits(console, session),
        Operation::AggregateStatistics => statistics(console, session, report_format),
    };

    match result {
        Ok(flow) => Ok(flow),
        Err(e) => match e.downcast::<RecordError>() {
            Ok(record_error) => {
                console.say(describe(&record_error))?;
                Ok(Flow::Continue)
            }
            Err(other) => Err(other),
        },
    }
}

fn describe(err: &RecordError) -> String {
    match err {
        RecordError::NotFound {
            kind: RecordKind::Patient,
            ..
        } => "Patient not found.".into(),
        RecordError::NotFound {
            kind: RecordKind::Visit,
            ..
        } => "Visit not found.".into(),
        RecordError::DuplicateKey {
            kind: RecordKind::Patient,
            ..
        } => "Patient already exists.".into(),
        RecordError::DuplicateKey {
            kind: RecordKind::Visit,
            ..
        } => "Visit already exists.".into(),
        RecordError::InvalidDate(_) => "Invalid date format.".into(),
        RecordError::Forbidden { operation, .. } => {
            format!("You are not permitted to {operation}.")
        }
        other => format!("Error: {other}."),
    }
}

fn ask_id<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    label: &str,
) -> anyhow::Result<Option<NonEmptyText>> {
    match console.prompt(label)? {
        Some(answer) => Ok(Some(NonEmptyText::new(answer).map_err(RecordError::from)?)),
        None => Ok(None),
    }
}

fn add_patient<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let Some(patient_id) = ask_id(console, "Enter Patient_ID: ")? else {
        return Ok(Flow::End);
    };
    session.check_new_patient_id(patient_id.as_str())?;

    let gender = ask!(console, "Enter Gender: ");
    let race = ask!(console, "Enter Race: ");
    let age = parse_age(&ask!(console, "Enter Age: "))?;
    let ethnicity = ask!(console, "Enter Ethnicity: ");
    let insurance = ask!(console, "Enter Insurance: ");
    let zip_code = ask!(console, "Enter Zip code: ");

    let demographics = Demographics {
        gender,
        race,
        age,
        ethnicity,
        insurance,
        zip_code,
    };
    session.add_patient(PatientRecord::new(patient_id, demographics))?;
    console.say("Patient added successfully.")?;
    Ok(Flow::Continue)
}

fn remove_patient<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let patient_id = ask!(console, "Enter Patient_ID: ");
    session.remove_patient(patient_id.trim())?;
    console.say("Patient removed successfully.")?;
    Ok(Flow::Continue)
}

fn retrieve_patient<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let patient_id = ask!(console, "Enter Patient_ID: ");
    let patient = session.retrieve_patient(patient_id.trim())?;
    report::render_patient(console.output(), patient)?;
    Ok(Flow::Continue)
}

fn add_visit<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let patient_id = ask!(console, "Enter Patient_ID: ");
    let Some(visit_id) = ask_id(console, "Enter Visit_ID: ")? else {
        return Ok(Flow::End);
    };
    let visit_time = parse_visit_time(&ask!(console, "Enter Visit date (YYYY-MM-DD): "))?;
    let department = ask!(console, "Enter Department: ");
    let chief_complaint = ask!(console, "Enter Chief complaint: ");

    let visit = VisitRecord::new(visit_id, visit_time, department, chief_complaint);
    session.add_visit(patient_id.trim(), visit)?;
    console.say("Visit added successfully.")?;
    Ok(Flow::Continue)
}

fn add_note<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let patient_id = ask!(console, "Enter Patient_ID: ");
    let visit_id = ask!(console, "Enter Visit_ID: ");
    let Some(note_id) = ask_id(console, "Enter Note_ID: ")? else {
        return Ok(Flow::End);
    };
    let note_type = ask!(console, "Enter Note type: ");

    session.add_note(
        patient_id.trim(),
        visit_id.trim(),
        NoteRecord::new(note_id, note_type),
    )?;
    console.say("Note added successfully.")?;
    Ok(Flow::Continue)
}

fn statistics<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
    report_format: ReportFormat,
) -> anyhow::Result<Flow> {
    console.say("Generating key statistics reports...")?;
    let stats = session.aggregate_statistics()?;
    report::render_statistics(console.output(), &stats, report_format)?;
    console.say("Key statistics reports generated successfully.")?;
    Ok(Flow::Continue)
}

fn count_visits<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session<'_>,
) -> anyhow::Result<Flow> {
    let date = parse_date(&ask!(console, "Enter date (YYYY-MM-DD): "))?;
    let total = session.count_visits_on_date(date)?;
    console.say(format!("Total visits on {date} : {total}"))?;
    Ok(Flow::Continue)
}
