//! Daily and weekly report data.
//!
//! Reports are plain values; rendering them is the caller's concern.

use chrono::FixedOffset;

use crate::aggregate::{
    DayTotals, GoalProgress, SubjectTotals, daily_totals, filter_by_logical_range, goal_progress,
    percent_change, task_completion_rate, total_duration_by_subject, total_questions_by_subject,
};
use crate::day::{LogicalDay, LogicalRange};
use crate::exam::ExamConfig;
use crate::model::{QuestionGoal, StudySession, Task, TestRecord};

/// Everything a report is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub exam: &'a ExamConfig,
    pub goal: QuestionGoal,
    pub offset: FixedOffset,
    pub sessions: &'a [StudySession],
    pub tasks: &'a [Task],
    pub tests: &'a [TestRecord],
}

/// Figures shared by daily and weekly reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSummary {
    pub range: LogicalRange,
    pub study_secs: SubjectTotals,
    pub questions: SubjectTotals,
    pub totals: DayTotals,
    pub goal: GoalProgress,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    /// Completion rate of the tasks created in the range.
    pub task_completion: u32,
    pub tests_taken: usize,
}

impl RangeSummary {
    fn build(input: &ReportInput<'_>, range: LogicalRange, target: u32) -> Self {
        let sessions = filter_by_logical_range(input.sessions, &range, input.offset);
        let tasks = filter_by_logical_range(input.tasks, &range, input.offset);
        let tests = filter_by_logical_range(input.tests, &range, input.offset);

        let study_secs = total_duration_by_subject(sessions.iter().copied(), input.exam);
        let questions = total_questions_by_subject(sessions.iter().copied(), input.exam);
        let totals = DayTotals {
            study_secs: study_secs.values().sum(),
            questions: questions.values().sum(),
        };

        Self {
            range,
            goal: goal_progress(sessions.iter().copied(), input.exam, target),
            study_secs,
            questions,
            totals,
            tasks_total: tasks.len(),
            tasks_completed: tasks.iter().filter(|t| t.is_completed()).count(),
            task_completion: task_completion_rate(tasks.iter().copied()),
            tests_taken: tests.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub day: LogicalDay,
    pub summary: RangeSummary,
}

impl DailyReport {
    #[must_use]
    pub fn build(input: &ReportInput<'_>, day: LogicalDay) -> Self {
        Self {
            day,
            summary: RangeSummary::build(input, LogicalRange::single(day), input.goal.daily()),
        }
    }
}

/// Week-over-week changes in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekChange {
    pub study_time: i64,
    pub questions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub summary: RangeSummary,
    /// One entry per day of the week, Monday first, zero-filled.
    pub per_day: Vec<(LogicalDay, DayTotals)>,
    pub previous: DayTotals,
    pub change: WeekChange,
}

impl WeeklyReport {
    /// Report for the Monday-to-Sunday week containing `day`.
    #[must_use]
    pub fn build(input: &ReportInput<'_>, day: LogicalDay) -> Self {
        let week = LogicalRange::week_of(day);
        let summary = RangeSummary::build(input, week, input.goal.weekly());

        let in_week = filter_by_logical_range(input.sessions, &week, input.offset);
        let by_day = daily_totals(
            in_week
                .iter()
                .copied()
                .filter(|s| input.exam.allows(s.subject())),
            input.offset,
        );
        let per_day = week
            .days()
            .map(|d| (d, by_day.get(&d).copied().unwrap_or_default()))
            .collect();

        let previous_week = week.previous_week();
        let previous = filter_by_logical_range(input.sessions, &previous_week, input.offset)
            .into_iter()
            .filter(|s| input.exam.allows(s.subject()))
            .fold(DayTotals::default(), |mut acc, s| {
                acc.study_secs += s.duration_secs();
                acc.questions += u64::from(s.questions());
                acc
            });

        let change = WeekChange {
            study_time: percent_change(summary.totals.study_secs, previous.study_secs),
            questions: percent_change(summary.totals.questions, previous.questions),
        };

        Self {
            summary,
            per_day,
            previous,
            change,
        }
    }
}
