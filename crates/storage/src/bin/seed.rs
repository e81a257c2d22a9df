use std::fmt;

use chrono::{DateTime, Duration, Utc};
use storage::Snapshots;
use storage::repository::Storage;
use study_core::exam::ExamType;
use study_core::model::{SessionDraft, SessionId, Task, TaskId};

/// Same database the `study` binary opens by default.
const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    exam: ExamType,
    days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExam { raw: String },
    InvalidDays { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExam { raw } => write!(f, "invalid --exam value: {raw}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut exam = std::env::var("STUDY_EXAM")
            .ok()
            .and_then(|value| value.parse::<ExamType>().ok())
            .unwrap_or_default();
        let mut days = std::env::var("STUDY_SEED_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(7);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--exam" => {
                    let value = require_value(&mut args, "--exam")?;
                    exam = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidExam { raw: value.clone() })?;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            exam,
            days,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --exam <JEE|NEET>         Exam whose subjects are seeded (default: JEE)");
    eprintln!("  --days <n>                Days of sessions to generate (default: 7)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_EXAM, STUDY_SEED_DAYS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let snapshots = Snapshots::new(storage.kv.clone());
    let now = args.now.unwrap_or_else(Utc::now);
    let config = args.exam.config();
    let subjects: Vec<_> = config.subjects().collect();

    let mut settings = snapshots.load_settings().await?;
    if settings.exam() != args.exam {
        settings = settings.for_exam(args.exam);
        snapshots.save_settings(&settings).await?;
    }

    let mut tasks = snapshots.load_tasks().await?;
    for (i, subject) in subjects.iter().enumerate() {
        let title = format!("Revise {subject} chapter {}", i + 1);
        tasks.push(Task::new(TaskId::generate(), title, *subject, config, now)?);
    }

    let mut sessions = snapshots.load_sessions().await?;
    for day in 0..args.days {
        let base = now - Duration::days(i64::from(day)) - Duration::hours(10);
        for (slot, subject) in subjects.iter().enumerate() {
            let offset = i64::try_from(slot)? * 3;
            let start = base + Duration::hours(offset);
            let minutes = 60 + 15 * i64::from((day + u32::try_from(slot)?) % 4);
            let questions = 15 + 5 * ((day + u32::try_from(slot)?) % 3);
            let session = SessionDraft::new(*subject, start, start + Duration::minutes(minutes))
                .with_questions(questions)
                .validate(config)?
                .assign_id(SessionId::generate());
            sessions.push(session);
        }
    }

    snapshots.save_tasks(&tasks).await?;
    snapshots.save_sessions(&sessions).await?;

    println!(
        "Seeded {} days of {} sessions ({} total) and {} tasks into {}",
        args.days,
        args.exam,
        sessions.len(),
        tasks.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
