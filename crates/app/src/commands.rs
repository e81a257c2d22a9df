use std::error::Error;
use std::io::Write;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use services::{AppServices, SessionEdit, TaskServiceError};
use study_core::day::{LogicalDay, LogicalRange};
use study_core::model::{SessionDraft, StudySession, Task, TaskId, TestRecord, TestRecordDraft};
use study_core::report::{DailyReport, RangeSummary, WeeklyReport};
use tracing::debug;

use crate::args::{
    ArgsError, Command, LogArgs, NotesEdit, Period, TaskCommand, TestCommand, TimerCommand, USAGE,
};

type CommandResult = Result<(), Box<dyn Error>>;

/// Run one parsed command against the services and write its output to `out`.
pub async fn execute<W: Write>(command: Command, app: &AppServices, out: &mut W) -> CommandResult {
    debug!(?command, "executing command");
    match command {
        Command::Log(log) => log_session(app, log, out).await,
        Command::Sessions(period) => list_sessions(app, period, out).await,
        Command::EditSession {
            id,
            end,
            questions,
            notes,
        } => {
            let edit = SessionEdit {
                ended_at: end,
                questions,
                notes: match notes {
                    NotesEdit::Keep => None,
                    NotesEdit::Set(text) => Some(Some(text)),
                    NotesEdit::Clear => Some(None),
                },
            };
            if edit.is_empty() {
                return Err(ArgsError::MissingArgument("--end, --questions or --notes").into());
            }
            let session = app.sessions().edit(id, edit).await?;
            writeln!(out, "updated {}", describe_session(&session, app.clock().offset()))?;
            Ok(())
        }
        Command::DeleteSession(id) => {
            app.sessions().delete(id).await?;
            writeln!(out, "deleted session {id}")?;
            Ok(())
        }
        Command::Timer(timer) => run_timer(app, timer, out).await,
        Command::Task(task) => run_task(app, task, out).await,
        Command::Test(test) => run_test(app, test, out).await,
        Command::Report(Period::Day(date)) => {
            let report = app.reports().daily(day_or_today(app, date)).await?;
            write_daily(&report, out)?;
            Ok(())
        }
        Command::Report(Period::Week(date)) => {
            let report = app.reports().weekly(day_or_today(app, date)).await?;
            write_weekly(&report, out)?;
            Ok(())
        }
        Command::Streak { rebuild } => {
            let streak = app.streak();
            let state = match rebuild {
                Some(days) => streak.rebuild(days).await?,
                None => streak.refresh().await?,
            };
            let thresholds = streak.thresholds().await?;
            writeln!(out, "current streak  {} days", state.current())?;
            writeln!(out, "longest streak  {} days", state.longest())?;
            if let Some(day) = state.last_streak_day() {
                writeln!(out, "last credited   {day}")?;
            }
            writeln!(
                out,
                "a day counts at {:.1}h of study and {} questions",
                thresholds.min_study_hours(),
                thresholds.min_questions()
            )?;
            let history = state.history();
            for entry in &history[history.len().saturating_sub(7)..] {
                let mark = if entry.qualified { "yes" } else { "no " };
                writeln!(out, "  {}  {mark}  {}", entry.day, entry.streak)?;
            }
            Ok(())
        }
        Command::StreakConfig { hours, questions } => {
            if hours.is_none() && questions.is_none() {
                let thresholds = app.streak().thresholds().await?;
                writeln!(
                    out,
                    "min study hours {:.1}, min questions {}",
                    thresholds.min_study_hours(),
                    thresholds.min_questions()
                )?;
                return Ok(());
            }
            let current = app.streak().thresholds().await?;
            let settings = app
                .settings()
                .set_streak_settings(
                    hours.unwrap_or_else(|| current.min_study_hours()),
                    questions.unwrap_or_else(|| current.min_questions()),
                )
                .await?;
            writeln!(
                out,
                "streak now needs {:.1}h of study and {} questions",
                settings.streak().min_study_hours(),
                settings.streak().min_questions()
            )?;
            Ok(())
        }
        Command::Exam(None) => {
            let settings = app.settings().load().await?;
            let exam = settings.exam();
            let subjects = exam
                .config()
                .tracked_subjects()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "{exam} ({} marks): {subjects}", exam.config().total_marks())?;
            Ok(())
        }
        Command::Exam(Some(target)) => {
            let migration = app.settings().switch_exam(target).await?;
            if migration.is_noop() {
                writeln!(out, "already preparing for {target}")?;
            } else {
                writeln!(
                    out,
                    "switched {} -> {}: discarded {} sessions, {} tasks, {} tests",
                    migration.from,
                    migration.to,
                    migration.sessions_discarded,
                    migration.tasks_discarded,
                    migration.tests_discarded
                )?;
            }
            Ok(())
        }
        Command::Subject(None) => {
            let settings = app.settings().load().await?;
            writeln!(out, "active subject: {}", settings.active_subject())?;
            Ok(())
        }
        Command::Subject(Some(subject)) => {
            let settings = app.settings().set_active_subject(subject).await?;
            writeln!(out, "active subject: {}", settings.active_subject())?;
            Ok(())
        }
        Command::Goal(None) => {
            let goal = app.settings().goal().await?;
            writeln!(
                out,
                "daily goal {} questions, weekly {}",
                goal.daily(),
                goal.weekly()
            )?;
            Ok(())
        }
        Command::Goal(Some(daily)) => {
            let goal = app.settings().set_goal(daily).await?;
            writeln!(
                out,
                "daily goal {} questions, weekly {}",
                goal.daily(),
                goal.weekly()
            )?;
            Ok(())
        }
        Command::Help => {
            writeln!(out, "{USAGE}")?;
            Ok(())
        }
    }
}

fn day_or_today(app: &AppServices, date: Option<NaiveDate>) -> LogicalDay {
    date.map_or_else(|| app.clock().today(), LogicalDay::from_date)
}

async fn find_task(app: &AppServices, id: TaskId) -> Result<Task, TaskServiceError> {
    app.tasks()
        .list()
        .await?
        .into_iter()
        .find(|task| task.id() == id)
        .ok_or(TaskServiceError::NotFound(id))
}

async fn log_session<W: Write>(app: &AppServices, log: LogArgs, out: &mut W) -> CommandResult {
    let now = app.clock().now();
    let (start, end) = match (log.start, log.end, log.minutes) {
        (Some(start), Some(end), _) => (start, end),
        (Some(start), None, Some(minutes)) => (start, start + Duration::minutes(minutes.into())),
        (None, _, Some(minutes)) => (now - Duration::minutes(minutes.into()), now),
        _ => return Err(ArgsError::MissingArgument("--end or --minutes").into()),
    };

    let mut draft = SessionDraft::new(log.subject, start, end).with_questions(log.questions);
    if let Some(task_id) = log.task {
        draft = draft.with_goal(find_task(app, task_id).await?.as_goal());
    }
    if let Some(notes) = log.notes {
        draft = draft.with_notes(notes);
    }

    let session = app.sessions().add_manual(draft).await?;
    writeln!(out, "logged {}", describe_session(&session, app.clock().offset()))?;
    Ok(())
}

async fn list_sessions<W: Write>(
    app: &AppServices,
    period: Option<Period>,
    out: &mut W,
) -> CommandResult {
    let sessions = match period {
        None => app.sessions().list().await?,
        Some(Period::Day(date)) => {
            let range = LogicalRange::single(day_or_today(app, date));
            app.sessions().list_in_range(&range).await?
        }
        Some(Period::Week(date)) => {
            let range = LogicalRange::week_of(day_or_today(app, date));
            app.sessions().list_in_range(&range).await?
        }
    };

    if sessions.is_empty() {
        writeln!(out, "no sessions")?;
    }
    let offset = app.clock().offset();
    for session in &sessions {
        writeln!(out, "{}  {}", session.id(), describe_session(session, offset))?;
    }
    Ok(())
}

async fn run_timer<W: Write>(app: &AppServices, command: TimerCommand, out: &mut W) -> CommandResult {
    let timer = app.timer();
    match command {
        TimerCommand::Start { subject, task } => {
            let subject = match subject {
                Some(subject) => subject,
                None => app.settings().load().await?.active_subject(),
            };
            let started = timer.start(subject, task).await?;
            write!(out, "timing {}", started.subject())?;
            if let Some(goal) = started.goal() {
                write!(out, " for \"{}\"", goal.title)?;
            }
            writeln!(out)?;
        }
        TimerCommand::Pause => {
            let status = timer.pause().await?;
            writeln!(out, "paused at {}", clock_face(status.elapsed))?;
        }
        TimerCommand::Resume => {
            let status = timer.resume().await?;
            writeln!(out, "resumed at {}", clock_face(status.elapsed))?;
        }
        TimerCommand::Stop { questions, notes } => {
            let session = timer.stop(questions, notes).await?;
            writeln!(out, "logged {}", describe_session(&session, app.clock().offset()))?;
        }
        TimerCommand::Status => match timer.status().await? {
            None => writeln!(out, "no active timer")?,
            Some(status) => {
                let state = if status.timer.is_running() {
                    "running"
                } else {
                    "paused"
                };
                writeln!(
                    out,
                    "{} {state} {}",
                    status.timer.subject(),
                    clock_face(status.elapsed)
                )?;
            }
        },
    }
    Ok(())
}

async fn run_task<W: Write>(app: &AppServices, command: TaskCommand, out: &mut W) -> CommandResult {
    let tasks = app.tasks();
    match command {
        TaskCommand::Add { subject, title } => {
            let task = tasks.add(&title, subject).await?;
            writeln!(out, "added {}", describe_task(&task))?;
        }
        TaskCommand::Done(id) => {
            let task = tasks.toggle(id).await?;
            writeln!(out, "{}", describe_task(&task))?;
        }
        TaskCommand::Rename { id, title } => {
            let task = tasks.rename(id, &title).await?;
            writeln!(out, "{}", describe_task(&task))?;
        }
        TaskCommand::Remove(id) => {
            tasks.delete(id).await?;
            writeln!(out, "removed task {id}")?;
        }
        TaskCommand::List(subject) => {
            let list = match subject {
                Some(subject) => tasks.list_for_subject(subject).await?,
                None => tasks.list().await?,
            };
            if list.is_empty() {
                writeln!(out, "no tasks")?;
            }
            for task in &list {
                writeln!(out, "{}", describe_task(task))?;
            }
        }
    }
    Ok(())
}

async fn run_test<W: Write>(app: &AppServices, command: TestCommand, out: &mut W) -> CommandResult {
    let tests = app.tests();
    match command {
        TestCommand::Add {
            date,
            minutes,
            scores,
            notes,
        } => {
            let draft = TestRecordDraft {
                date: date.unwrap_or_else(|| app.clock().today().date()),
                time_spent_minutes: minutes,
                subjects: scores,
                notes,
            };
            let record = tests.add(draft).await?;
            writeln!(out, "recorded {}", describe_test(&record))?;
        }
        TestCommand::List => {
            let list = tests.list().await?;
            if list.is_empty() {
                writeln!(out, "no tests")?;
            }
            for record in &list {
                writeln!(out, "{}", describe_test(record))?;
                for entry in record.subjects() {
                    writeln!(
                        out,
                        "    {:<12} {:>4}  {}/{} correct, {} wrong",
                        entry.subject.to_string(),
                        entry.score,
                        entry.correct,
                        entry.attempted,
                        entry.incorrect()
                    )?;
                }
            }
        }
        TestCommand::Remove(id) => {
            tests.delete(id).await?;
            writeln!(out, "removed test {id}")?;
        }
    }
    Ok(())
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn hours_minutes(secs: u64) -> String {
    format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
}

fn clock_face(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn local(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string()
}

fn describe_session(session: &StudySession, offset: FixedOffset) -> String {
    let mut line = format!(
        "{} {} -> {} ({}, {} q)",
        session.subject(),
        local(session.started_at(), offset),
        session.ended_at().with_timezone(&offset).format("%H:%M"),
        hours_minutes(session.duration_secs()),
        session.questions()
    );
    if let Some(goal) = session.goal() {
        line.push_str(&format!(" [{}]", goal.title));
    }
    if let Some(notes) = session.notes() {
        line.push_str(&format!(" {notes}"));
    }
    line
}

fn describe_task(task: &Task) -> String {
    let mark = if task.is_completed() { "x" } else { " " };
    format!("[{mark}] {} {} {}", task.id(), task.subject(), task.title())
}

fn describe_test(record: &TestRecord) -> String {
    format!(
        "{} {} {} {}/{} ({}% accuracy, {} min)",
        record.id(),
        record.date(),
        record.exam(),
        record.total_score(),
        record.total_marks(),
        record.accuracy(),
        record.time_spent_minutes()
    )
}

fn write_summary<W: Write>(summary: &RangeSummary, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "  study      {}", hours_minutes(summary.totals.study_secs))?;
    writeln!(
        out,
        "  questions  {} / {} ({}%)",
        summary.goal.done, summary.goal.target, summary.goal.percent
    )?;
    for (subject, secs) in &summary.study_secs {
        let questions = summary.questions.get(subject).copied().unwrap_or_default();
        writeln!(
            out,
            "    {:<12} {}  {questions} q",
            subject.to_string(),
            hours_minutes(*secs)
        )?;
    }
    writeln!(
        out,
        "  tasks      {}/{} done ({}%)",
        summary.tasks_completed, summary.tasks_total, summary.task_completion
    )?;
    writeln!(out, "  tests      {}", summary.tests_taken)
}

fn write_daily<W: Write>(report: &DailyReport, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", report.day)?;
    write_summary(&report.summary, out)
}

fn write_weekly<W: Write>(report: &WeeklyReport, out: &mut W) -> std::io::Result<()> {
    let range = report.summary.range;
    writeln!(out, "week {} .. {}", range.start(), range.end())?;
    write_summary(&report.summary, out)?;
    for (day, totals) in &report.per_day {
        writeln!(
            out,
            "    {} {}  {} q",
            day.date().format("%a %m-%d"),
            hours_minutes(totals.study_secs),
            totals.questions
        )?;
    }
    writeln!(
        out,
        "  vs last week: study {:+}%, questions {:+}%",
        report.change.study_time, report.change.questions
    )
}
