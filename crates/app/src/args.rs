use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use study_core::exam::ExamType;
use study_core::model::{SessionId, Subject, SubjectScore, TaskId, TestRecordId};

pub const USAGE: &str = "\
usage: study [--db <url>] [--now <rfc3339>] <command>

commands:
  log <subject> (--start <ts> (--end <ts> | --minutes <n>) | --minutes <n>)
      [--questions <n>] [--task <id>] [--notes <text>]
  sessions [day [<date>] | week [<date>]]
  edit-session <id> [--end <ts>] [--questions <n>] [--notes <text> | --clear-notes]
  delete-session <id>
  timer start [<subject>] [--task <id>]
  timer pause | resume | status
  timer stop [--questions <n>] [--notes <text>]
  task add <subject> <title...>
  task done <id> | remove <id>
  task rename <id> <title...>
  task list [<subject>]
  test add [--date <date>] --minutes <n> --score <subject:score:attempted:correct>...
      [--notes <text>]
  test list | remove <id>
  report day [<date>] | week [<date>]
  streak [--rebuild <days>]
  streak-config [--hours <h>] [--questions <n>]
  exam [JEE | NEET]
  subject [<subject>]
  goal [<n>]
  help

timestamps are RFC 3339, dates are YYYY-MM-DD";

#[derive(Debug, PartialEq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument(&'static str),
    UnknownArg(String),
    UnknownCommand(String),
    Conflict(&'static str, &'static str),
    InvalidValue { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument(what) => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => {
                write!(f, "unknown command: {cmd} (try `study help`)")
            }
            ArgsError::Conflict(a, b) => write!(f, "{a} cannot be combined with {b}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    match raw.parse() {
        Ok(value) => Ok(value),
        Err(_) => Err(ArgsError::InvalidValue { flag, raw }),
    }
}

fn flag_value<T: FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    parse_value(require_value(args, flag)?, flag)
}

fn timestamp(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<DateTime<Utc>, ArgsError> {
    let raw = require_value(args, flag)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(_) => Err(ArgsError::InvalidValue { flag, raw }),
    }
}

fn date(raw: String, flag: &'static str) -> Result<NaiveDate, ArgsError> {
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Ok(date),
        Err(_) => Err(ArgsError::InvalidValue { flag, raw }),
    }
}

fn positional<T: FromStr>(
    args: &mut impl Iterator<Item = String>,
    what: &'static str,
) -> Result<T, ArgsError> {
    let raw = args.next().ok_or(ArgsError::MissingArgument(what))?;
    parse_value(raw, what)
}

fn no_more(mut args: impl Iterator<Item = String>) -> Result<(), ArgsError> {
    match args.next() {
        Some(extra) => Err(ArgsError::UnknownArg(extra)),
        None => Ok(()),
    }
}

fn rest_as_text(
    args: impl Iterator<Item = String>,
    what: &'static str,
) -> Result<String, ArgsError> {
    let text = args.collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        return Err(ArgsError::MissingArgument(what));
    }
    Ok(text)
}

/// `subject:score:attempted:correct`, e.g. `physics:-4:10:3`.
fn subject_score(raw: String) -> Result<SubjectScore, ArgsError> {
    score_parts(&raw).ok_or(ArgsError::InvalidValue {
        flag: "--score",
        raw,
    })
}

fn score_parts(raw: &str) -> Option<SubjectScore> {
    let mut parts = raw.split(':');
    let subject = parts.next()?.parse().ok()?;
    let score = parts.next()?.parse().ok()?;
    let attempted = parts.next()?.parse().ok()?;
    let correct = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(SubjectScore::new(subject, score, attempted, correct))
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct LogArgs {
    pub subject: Subject,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub minutes: Option<u32>,
    pub questions: u32,
    pub task: Option<TaskId>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotesEdit {
    Keep,
    Set(String),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day(Option<NaiveDate>),
    Week(Option<NaiveDate>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerCommand {
    Start {
        subject: Option<Subject>,
        task: Option<TaskId>,
    },
    Pause,
    Resume,
    Stop {
        questions: u32,
        notes: Option<String>,
    },
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskCommand {
    Add { subject: Subject, title: String },
    Done(TaskId),
    Rename { id: TaskId, title: String },
    Remove(TaskId),
    List(Option<Subject>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestCommand {
    Add {
        date: Option<NaiveDate>,
        minutes: u32,
        scores: Vec<SubjectScore>,
        notes: Option<String>,
    },
    List,
    Remove(TestRecordId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Log(LogArgs),
    Sessions(Option<Period>),
    EditSession {
        id: SessionId,
        end: Option<DateTime<Utc>>,
        questions: Option<i64>,
        notes: NotesEdit,
    },
    DeleteSession(SessionId),
    Timer(TimerCommand),
    Task(TaskCommand),
    Test(TestCommand),
    Report(Period),
    Streak { rebuild: Option<u32> },
    StreakConfig { hours: Option<f64>, questions: Option<u32> },
    Exam(Option<ExamType>),
    Subject(Option<Subject>),
    Goal(Option<u32>),
    Help,
}

impl Command {
    /// Parse the command line after the global flags.
    pub fn parse(args: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };

        match name.as_str() {
            "log" => parse_log(args),
            "sessions" => Ok(Command::Sessions(parse_period(args)?)),
            "edit-session" => parse_edit_session(args),
            "delete-session" => {
                let id = positional(&mut args, "session id")?;
                no_more(args)?;
                Ok(Command::DeleteSession(id))
            }
            "timer" => parse_timer(args),
            "task" => parse_task(args),
            "test" => parse_test(args),
            "report" => parse_period(args)?
                .map(Command::Report)
                .ok_or(ArgsError::MissingArgument("report period (day or week)")),
            "streak" => {
                let mut rebuild = None;
                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "--rebuild" => rebuild = Some(flag_value(&mut args, "--rebuild")?),
                        _ => return Err(ArgsError::UnknownArg(arg)),
                    }
                }
                Ok(Command::Streak { rebuild })
            }
            "streak-config" => {
                let (mut hours, mut questions) = (None, None);
                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "--hours" => hours = Some(flag_value(&mut args, "--hours")?),
                        "--questions" => questions = Some(flag_value(&mut args, "--questions")?),
                        _ => return Err(ArgsError::UnknownArg(arg)),
                    }
                }
                Ok(Command::StreakConfig { hours, questions })
            }
            "exam" => optional_positional(args, "exam").map(Command::Exam),
            "subject" => optional_positional(args, "subject").map(Command::Subject),
            "goal" => optional_positional(args, "goal").map(Command::Goal),
            "help" | "--help" | "-h" => Ok(Command::Help),
            _ => Err(ArgsError::UnknownCommand(name)),
        }
    }
}

fn optional_positional<T: FromStr>(
    mut args: impl Iterator<Item = String>,
    what: &'static str,
) -> Result<Option<T>, ArgsError> {
    let value = args.next().map(|raw| parse_value(raw, what)).transpose()?;
    no_more(args)?;
    Ok(value)
}

fn parse_period(mut args: impl Iterator<Item = String>) -> Result<Option<Period>, ArgsError> {
    let Some(kind) = args.next() else {
        return Ok(None);
    };
    let day = args.next().map(|raw| date(raw, "date")).transpose()?;
    no_more(args)?;
    match kind.as_str() {
        "day" => Ok(Some(Period::Day(day))),
        "week" => Ok(Some(Period::Week(day))),
        _ => Err(ArgsError::UnknownArg(kind)),
    }
}

fn parse_log(mut args: impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let subject = positional(&mut args, "subject")?;
    let mut log = LogArgs {
        subject,
        start: None,
        end: None,
        minutes: None,
        questions: 0,
        task: None,
        notes: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" => log.start = Some(timestamp(&mut args, "--start")?),
            "--end" => log.end = Some(timestamp(&mut args, "--end")?),
            "--minutes" => log.minutes = Some(flag_value(&mut args, "--minutes")?),
            "--questions" => log.questions = flag_value(&mut args, "--questions")?,
            "--task" => log.task = Some(flag_value(&mut args, "--task")?),
            "--notes" => log.notes = Some(require_value(&mut args, "--notes")?),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    if log.end.is_some() && log.minutes.is_some() {
        return Err(ArgsError::Conflict("--minutes", "--end"));
    }
    if log.end.is_none() && log.minutes.is_none() {
        return Err(ArgsError::MissingArgument("--end or --minutes"));
    }
    if log.end.is_some() && log.start.is_none() {
        return Err(ArgsError::MissingArgument("--start"));
    }
    Ok(Command::Log(log))
}

fn parse_edit_session(mut args: impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let id = positional(&mut args, "session id")?;
    let (mut end, mut questions, mut notes) = (None, None, NotesEdit::Keep);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--end" => end = Some(timestamp(&mut args, "--end")?),
            "--questions" => questions = Some(flag_value(&mut args, "--questions")?),
            "--notes" => notes = NotesEdit::Set(require_value(&mut args, "--notes")?),
            "--clear-notes" => notes = NotesEdit::Clear,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    Ok(Command::EditSession {
        id,
        end,
        questions,
        notes,
    })
}

fn parse_timer(mut args: impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let action = args
        .next()
        .ok_or(ArgsError::MissingArgument("timer action"))?;
    let command = match action.as_str() {
        "start" => {
            let (mut subject, mut task) = (None, None);
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--task" => task = Some(flag_value(&mut args, "--task")?),
                    _ if subject.is_none() && !arg.starts_with("--") => {
                        subject = Some(parse_value(arg, "subject")?);
                    }
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            TimerCommand::Start { subject, task }
        }
        "stop" => {
            let (mut questions, mut notes) = (0, None);
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--questions" => questions = flag_value(&mut args, "--questions")?,
                    "--notes" => notes = Some(require_value(&mut args, "--notes")?),
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            TimerCommand::Stop { questions, notes }
        }
        "pause" => {
            no_more(args)?;
            TimerCommand::Pause
        }
        "resume" => {
            no_more(args)?;
            TimerCommand::Resume
        }
        "status" => {
            no_more(args)?;
            TimerCommand::Status
        }
        _ => return Err(ArgsError::UnknownArg(action)),
    };
    Ok(Command::Timer(command))
}

fn parse_task(mut args: impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let action = args.next().ok_or(ArgsError::MissingArgument("task action"))?;
    let command = match action.as_str() {
        "add" => {
            let subject = positional(&mut args, "subject")?;
            let title = rest_as_text(args, "task title")?;
            TaskCommand::Add { subject, title }
        }
        "done" => {
            let id = positional(&mut args, "task id")?;
            no_more(args)?;
            TaskCommand::Done(id)
        }
        "rename" => {
            let id = positional(&mut args, "task id")?;
            let title = rest_as_text(args, "task title")?;
            TaskCommand::Rename { id, title }
        }
        "remove" => {
            let id = positional(&mut args, "task id")?;
            no_more(args)?;
            TaskCommand::Remove(id)
        }
        "list" => TaskCommand::List(optional_positional(args, "subject")?),
        _ => return Err(ArgsError::UnknownArg(action)),
    };
    Ok(Command::Task(command))
}

fn parse_test(mut args: impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let action = args.next().ok_or(ArgsError::MissingArgument("test action"))?;
    let command = match action.as_str() {
        "add" => {
            let (mut day, mut minutes, mut scores, mut notes) = (None, None, Vec::new(), None);
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--date" => day = Some(date(require_value(&mut args, "--date")?, "--date")?),
                    "--minutes" => minutes = Some(flag_value(&mut args, "--minutes")?),
                    "--score" => scores.push(subject_score(require_value(&mut args, "--score")?)?),
                    "--notes" => notes = Some(require_value(&mut args, "--notes")?),
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            TestCommand::Add {
                date: day,
                minutes: minutes.ok_or(ArgsError::MissingArgument("--minutes"))?,
                scores,
                notes,
            }
        }
        "list" => {
            no_more(args)?;
            TestCommand::List
        }
        "remove" => {
            let id = positional(&mut args, "test id")?;
            no_more(args)?;
            TestCommand::Remove(id)
        }
        _ => return Err(ArgsError::UnknownArg(action)),
    };
    Ok(Command::Test(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, ArgsError> {
        Command::parse(line.split_whitespace().map(str::to_string).collect())
    }

    #[test]
    fn empty_command_line_shows_help() {
        assert_eq!(Command::parse(Vec::new()), Ok(Command::Help));
        assert_eq!(parse("help"), Ok(Command::Help));
    }

    #[test]
    fn log_accepts_range_or_minutes() {
        let Ok(Command::Log(log)) = parse(
            "log physics --start 2024-03-01T09:00:00Z --end 2024-03-01T10:30:00Z --questions 25",
        ) else {
            panic!("expected log command");
        };
        assert_eq!(log.subject, Subject::Physics);
        assert_eq!(log.questions, 25);
        assert_eq!(log.end.unwrap() - log.start.unwrap(), chrono::Duration::minutes(90));

        let Ok(Command::Log(log)) = parse("log classes --minutes 45") else {
            panic!("expected log command");
        };
        assert_eq!(log.minutes, Some(45));
        assert!(log.start.is_none());
    }

    #[test]
    fn log_requires_an_end() {
        assert_eq!(
            parse("log physics --start 2024-03-01T09:00:00Z"),
            Err(ArgsError::MissingArgument("--end or --minutes"))
        );
        assert_eq!(
            parse("log physics --end 2024-03-01T09:00:00Z"),
            Err(ArgsError::MissingArgument("--start"))
        );
        assert!(matches!(
            parse("log history --minutes 10"),
            Err(ArgsError::InvalidValue { flag: "subject", .. })
        ));
    }

    #[test]
    fn task_titles_keep_every_word() {
        assert_eq!(
            parse("task add chemistry Mole concept DPP"),
            Ok(Command::Task(TaskCommand::Add {
                subject: Subject::Chemistry,
                title: "Mole concept DPP".into(),
            }))
        );
        assert_eq!(
            parse("task add chemistry"),
            Err(ArgsError::MissingArgument("task title"))
        );
    }

    #[test]
    fn timer_start_subject_is_optional() {
        assert_eq!(
            parse("timer start"),
            Ok(Command::Timer(TimerCommand::Start {
                subject: None,
                task: None,
            }))
        );
        assert_eq!(
            parse("timer stop --questions 12"),
            Ok(Command::Timer(TimerCommand::Stop {
                questions: 12,
                notes: None,
            }))
        );
        assert_eq!(
            parse("timer pause now"),
            Err(ArgsError::UnknownArg("now".into()))
        );
    }

    #[test]
    fn test_scores_are_parsed_per_subject() {
        let Ok(Command::Test(TestCommand::Add { date, minutes, scores, .. })) = parse(
            "test add --date 2024-04-01 --minutes 180 --score physics:-4:10:3 --score chemistry:60:20:16",
        ) else {
            panic!("expected test add");
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(minutes, 180);
        assert_eq!(
            scores,
            vec![
                SubjectScore::new(Subject::Physics, -4, 10, 3),
                SubjectScore::new(Subject::Chemistry, 60, 20, 16),
            ]
        );

        assert!(matches!(
            parse("test add --minutes 10 --score physics:60"),
            Err(ArgsError::InvalidValue { flag: "--score", .. })
        ));
    }

    #[test]
    fn reports_and_settings() {
        assert_eq!(parse("report day"), Ok(Command::Report(Period::Day(None))));
        assert_eq!(
            parse("report week 2024-03-06"),
            Ok(Command::Report(Period::Week(NaiveDate::from_ymd_opt(2024, 3, 6))))
        );
        assert!(matches!(parse("report"), Err(ArgsError::MissingArgument(_))));
        assert_eq!(parse("exam NEET"), Ok(Command::Exam(Some(ExamType::Neet))));
        assert_eq!(parse("goal"), Ok(Command::Goal(None)));
        assert_eq!(
            parse("streak --rebuild 30"),
            Ok(Command::Streak { rebuild: Some(30) })
        );
        assert_eq!(
            parse("frobnicate"),
            Err(ArgsError::UnknownCommand("frobnicate".into()))
        );
    }
}
