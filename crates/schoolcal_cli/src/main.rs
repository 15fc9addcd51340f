//! Administrative command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `schoolcal_core::Calendar` operations.
//! - Print results as JSON on stdout and structured errors on stderr.

use clap::{Parser, Subcommand};
use schoolcal_core::db::{open_db_with_timeout, DbError};
use schoolcal_core::{
    init_logging_from_config, BatchReport, Calendar, CalendarError, CoreConfig, EventPatch,
    EventScope, IngestMode, IngestOptions, JsonRowSource,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "schoolcal")]
#[command(about = "Manage school and all-school calendar events")]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "schoolcal.sqlite3")]
    db: PathBuf,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a school; it inherits all current all-school events
    CreateUnit { name: String },
    /// List registered schools
    Units,
    /// List events of one school, or all-school events when omitted
    Events {
        #[arg(long)]
        unit: Option<Uuid>,
    },
    /// Load rows from a JSON array exported from a spreadsheet
    Ingest {
        file: PathBuf,
        /// Treat every row as an all-school event
        #[arg(long)]
        global: bool,
    },
    /// Create one event
    CreateEvent {
        title: String,
        date: String,
        #[arg(long)]
        unit: Option<Uuid>,
    },
    /// Change the title and/or date of an event
    UpdateEvent {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an event
    DeleteEvent { id: Uuid },
    /// Re-run inheritance of all-school events for one school
    Sync { unit: Uuid },
    /// Print the public calendar link of a school
    Link { unit: Uuid },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => match CoreConfig::load(path) {
            Ok(config) => config,
            Err(err) => return fail("config", &err.to_string()),
        },
        None => CoreConfig::default(),
    };

    if let Err(err) = init_logging_from_config(&config) {
        return fail("logging", &err);
    }

    let conn = match open_db_with_timeout(&cli.db, config.busy_timeout()) {
        Ok(conn) => conn,
        Err(err) => return fail(db_error_code(&err), &err.to_string()),
    };

    let calendar = match Calendar::new(&conn, config) {
        Ok(calendar) => calendar,
        Err(err) => return fail_with(&err),
    };

    match run(&calendar, cli.command) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(CliError::Calendar(err)) => fail_with(&err),
        Err(CliError::Io(err)) => fail("io", &err.to_string()),
    }
}

enum CliError {
    Calendar(CalendarError),
    Io(std::io::Error),
}

impl From<CalendarError> for CliError {
    fn from(value: CalendarError) -> Self {
        Self::Calendar(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn run(calendar: &Calendar<'_>, command: Commands) -> Result<Value, CliError> {
    let output = match command {
        Commands::CreateUnit { name } => {
            let registration = calendar.create_unit(&name)?;
            json!({
                "unit": registration.unit,
                "inherited": registration.sync.inherited.len(),
                "skipped": registration.sync.skipped,
                "failed": registration.sync.failures.len(),
            })
        }
        Commands::Units => json!(calendar.list_units()?),
        Commands::Events { unit } => json!(calendar.calendar_for_unit(unit)?),
        Commands::Ingest { file, global } => {
            let payload = std::fs::read_to_string(&file)?;
            let options = IngestOptions {
                mode: if global {
                    IngestMode::AllGlobal
                } else {
                    IngestMode::PerRow
                },
                cancel: None,
            };
            report_json(&calendar.ingest_source(&JsonRowSource::new(payload), options))
        }
        Commands::CreateEvent { title, date, unit } => {
            json!(calendar.create_event(&title, &date, unit)?)
        }
        Commands::UpdateEvent { id, title, date } => {
            let patch = EventPatch {
                title,
                date,
                ..EventPatch::default()
            };
            json!(calendar.update_event(id, &patch)?)
        }
        Commands::DeleteEvent { id } => {
            calendar.delete_event(id)?;
            json!({ "deleted": id })
        }
        Commands::Sync { unit } => {
            let report = calendar.sync_unit(unit)?;
            json!({
                "unit": report.unit_id,
                "inherited": report.inherited.len(),
                "skipped": report.skipped,
                "failed": report.failures.len(),
            })
        }
        Commands::Link { unit } => json!({ "link": calendar.share_link(unit)? }),
    };
    Ok(output)
}

fn report_json(report: &BatchReport) -> Value {
    let first_error = report.first_error.as_ref().map(|failure| {
        json!({
            "row": failure.row,
            "kind": failure.kind.as_str(),
            "reason": failure.reason,
            "retryable": failure.retryable,
        })
    });
    let global = report
        .outcomes
        .iter()
        .filter(|outcome| outcome.event().scope == EventScope::Global)
        .count();
    json!({
        "status": format!("{:?}", report.status).to_lowercase(),
        "committedCount": report.committed_count,
        "inserted": report.inserted_count,
        "skipped": report.skipped_count,
        "global": global,
        "firstError": first_error,
    })
}

fn db_error_code(err: &DbError) -> &'static str {
    if err.is_transient() {
        "storage_unavailable"
    } else {
        "storage"
    }
}

fn fail_with(err: &CalendarError) -> ExitCode {
    fail(err.kind().as_str(), &err.to_string())
}

fn fail(kind: &str, detail: &str) -> ExitCode {
    eprintln!("{}", json!({ "error": kind, "detail": detail }));
    ExitCode::FAILURE
}
