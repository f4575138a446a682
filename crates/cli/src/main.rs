use clap::Parser;
use hms_core::constants::DEFAULT_LOG_DIRECTIVE;
use hms_core::{load_patient_data, CoreConfig, CredentialStore, RecordStore};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod console;
mod menu;
mod report;

use console::Console;
use menu::RunOutcome;
use report::ReportFormat;

#[derive(Parser)]
#[command(name = "hms")]
#[command(about = "Browse, edit and report on hospital patient records")]
struct Cli {
    /// Credential file with `username,password,role` rows
    credentials: PathBuf,
    /// Patient data CSV file
    patient_data: PathBuf,
    /// Output format of the management statistics report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report_format: ReportFormat,
}

/// Loads both input files, then runs one login session on stdin/stdout.
///
/// Records live in memory only. Changes made during the session are discarded on exit.
///
/// Logging goes to stderr and is filtered by `RUST_LOG` (default `hms=warn`).
fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cfg = CoreConfig::new(cli.credentials, cli.patient_data)?;
    let credentials = CredentialStore::load(cfg.credentials_path())?;
    let mut store = RecordStore::new();
    load_patient_data(cfg.patient_data_path(), &mut store)?;

    let mut console = Console::new(io::stdin().lock(), io::stdout().lock());
    match menu::run(&mut console, &credentials, &mut store, cli.report_format)? {
        RunOutcome::Completed => Ok(ExitCode::SUCCESS),
        RunOutcome::AuthFailed => Ok(ExitCode::FAILURE),
    }
}
