//! Aggregation over session and task records.
//!
//! Every function here is pure: the output depends only on the arguments and
//! never on the order of the input records.

use std::collections::BTreeMap;

use chrono::FixedOffset;

use crate::day::{LogicalDated, LogicalDay, LogicalRange};
use crate::exam::ExamConfig;
use crate::model::{StudySession, Subject, Task};

/// Per-subject totals; always holds every tracked subject of the exam.
pub type SubjectTotals = BTreeMap<Subject, u64>;

/// Study time and questions of one logical day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTotals {
    pub study_secs: u64,
    pub questions: u64,
}

impl DayTotals {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn study_hours(&self) -> f64 {
        self.study_secs as f64 / 3600.0
    }
}

/// Question-goal progress for a day or a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub done: u64,
    pub target: u64,
    /// `round(100 * done / target)`, uncapped; 0 when the target is 0.
    pub percent: u32,
}

impl GoalProgress {
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.done)
    }

    #[must_use]
    pub fn is_met(&self) -> bool {
        self.done >= self.target
    }
}

/// Records whose logical day falls inside `range` (inclusive).
pub fn filter_by_logical_range<'a, T: LogicalDated>(
    records: &'a [T],
    range: &LogicalRange,
    offset: FixedOffset,
) -> Vec<&'a T> {
    records
        .iter()
        .filter(|record| range.contains(record.logical_day(offset)))
        .collect()
}

fn zeroed(exam: &ExamConfig) -> SubjectTotals {
    exam.tracked_subjects().into_iter().map(|s| (s, 0)).collect()
}

fn sum_by_subject<'a, I, F>(sessions: I, exam: &ExamConfig, value: F) -> SubjectTotals
where
    I: IntoIterator<Item = &'a StudySession>,
    F: Fn(&StudySession) -> u64,
{
    let mut totals = zeroed(exam);
    for session in sessions {
        if let Some(total) = totals.get_mut(&session.subject()) {
            *total += value(session);
        }
    }
    totals
}

/// Seconds studied per tracked subject. Sessions for subjects outside the
/// exam are ignored.
pub fn total_duration_by_subject<'a, I>(sessions: I, exam: &ExamConfig) -> SubjectTotals
where
    I: IntoIterator<Item = &'a StudySession>,
{
    sum_by_subject(sessions, exam, StudySession::duration_secs)
}

/// Questions solved per tracked subject.
pub fn total_questions_by_subject<'a, I>(sessions: I, exam: &ExamConfig) -> SubjectTotals
where
    I: IntoIterator<Item = &'a StudySession>,
{
    sum_by_subject(sessions, exam, |s| u64::from(s.questions()))
}

/// Questions across the exam's scored subjects (never `Classes`) against `target`.
pub fn goal_progress<'a, I>(sessions: I, exam: &ExamConfig, target: u32) -> GoalProgress
where
    I: IntoIterator<Item = &'a StudySession>,
{
    let done = total_questions_by_subject(sessions, exam)
        .into_iter()
        .filter(|(subject, _)| subject.counts_questions() && exam.contains(*subject))
        .map(|(_, n)| n)
        .sum();
    let target = u64::from(target);
    GoalProgress {
        done,
        target,
        percent: rounded_percent(done, target),
    }
}

/// Percentage of completed tasks, 0 when there are none.
pub fn task_completion_rate<'a, I>(tasks: I) -> u32
where
    I: IntoIterator<Item = &'a Task>,
{
    let (done, total) = tasks.into_iter().fold((0_u64, 0_u64), |(d, t), task| {
        (d + u64::from(task.is_completed()), t + 1)
    });
    rounded_percent(done, total)
}

/// Relative change from `previous` to `current` in whole percent.
///
/// With no baseline the change is 100 if anything happened and 0 otherwise.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn percent_change(current: u64, previous: u64) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    let delta = current as f64 - previous as f64;
    (100.0 * delta / previous as f64).round() as i64
}

/// Study time and questions per logical day, for days with at least one session.
pub fn daily_totals<'a, I>(sessions: I, offset: FixedOffset) -> BTreeMap<LogicalDay, DayTotals>
where
    I: IntoIterator<Item = &'a StudySession>,
{
    let mut by_day: BTreeMap<LogicalDay, DayTotals> = BTreeMap::new();
    for session in sessions {
        let entry = by_day.entry(session.logical_day(offset)).or_default();
        entry.study_secs += session.duration_secs();
        entry.questions += u64::from(session.questions());
    }
    by_day
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn rounded_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::ExamType;
    use crate::model::{SessionDraft, SessionId, TaskId};
    use crate::time::fixed_now;
    use chrono::{DateTime, Duration, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn session(subject: Subject, start: DateTime<Utc>, mins: i64, questions: u32) -> StudySession {
        SessionDraft::new(subject, start, start + Duration::minutes(mins))
            .with_questions(questions)
            .validate(ExamType::Jee.config())
            .unwrap()
            .assign_id(SessionId::generate())
    }

    fn sample() -> Vec<StudySession> {
        let t = fixed_now();
        vec![
            session(Subject::Physics, t, 60, 20),
            session(Subject::Chemistry, t + Duration::hours(2), 30, 15),
            session(Subject::Physics, t + Duration::hours(3), 45, 10),
            session(Subject::Classes, t + Duration::hours(5), 90, 4),
        ]
    }

    #[test]
    fn duration_totals_cover_every_tracked_subject() {
        let totals = total_duration_by_subject(&sample(), ExamType::Jee.config());
        assert_eq!(totals[&Subject::Physics], 105 * 60);
        assert_eq!(totals[&Subject::Chemistry], 30 * 60);
        assert_eq!(totals[&Subject::Mathematics], 0);
        assert_eq!(totals[&Subject::Classes], 90 * 60);
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn foreign_subjects_are_ignored() {
        let totals = total_duration_by_subject(&sample(), ExamType::Neet.config());
        assert_eq!(totals[&Subject::Physics], 105 * 60);
        assert!(!totals.contains_key(&Subject::Mathematics));
        assert_eq!(totals[&Subject::Botany], 0);
    }

    #[test]
    fn totals_do_not_depend_on_record_order() {
        let records = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(2);
        let exam = ExamType::Jee.config();

        for shuffled in [reversed, rotated] {
            assert_eq!(
                total_duration_by_subject(&shuffled, exam),
                total_duration_by_subject(&records, exam)
            );
            assert_eq!(
                total_questions_by_subject(&shuffled, exam),
                total_questions_by_subject(&records, exam)
            );
        }
    }

    #[test]
    fn goal_progress_excludes_classes() {
        let progress = goal_progress(&sample(), ExamType::Jee.config(), 60);
        assert_eq!(progress.done, 45);
        assert_eq!(progress.target, 60);
        assert_eq!(progress.percent, 75);
        assert_eq!(progress.remaining(), 15);

        let zero = goal_progress(&sample(), ExamType::Jee.config(), 0);
        assert_eq!(zero.percent, 0);
        assert!(zero.is_met());
    }

    #[test]
    fn completion_rate_handles_empty_and_full() {
        let exam = ExamType::Jee.config();
        assert_eq!(task_completion_rate(&Vec::<Task>::new()), 0);

        let done = Task::new(TaskId::generate(), "SHM", Subject::Physics, exam, fixed_now())
            .unwrap()
            .toggled();
        assert_eq!(task_completion_rate([&done]), 100);

        let open = Task::new(TaskId::generate(), "Moles", Subject::Chemistry, exam, fixed_now())
            .unwrap();
        let third = open.clone();
        assert_eq!(task_completion_rate([&done, &open, &third]), 33);
    }

    #[test]
    fn percent_change_policies() {
        assert_eq!(percent_change(0, 0), 0);
        assert_eq!(percent_change(50, 0), 100);
        assert_eq!(percent_change(80, 100), -20);
        assert_eq!(percent_change(150, 100), 50);
        assert_eq!(percent_change(4, 3), 33);
        assert_eq!(percent_change(1, 3), -67);
    }

    #[test]
    fn range_filter_uses_logical_days() {
        // fixed_now is 22:13:20 UTC; a session at 03:00 the next morning still
        // belongs to the same logical day, one at 05:00 does not.
        let t = fixed_now();
        let late = session(Subject::Physics, t + Duration::minutes(287), 20, 0);
        let early = session(Subject::Physics, t + Duration::minutes(407), 20, 0);
        let records = vec![late.clone(), early.clone()];

        let today = LogicalDay::of(t, utc());
        let hits = filter_by_logical_range(&records, &LogicalRange::single(today), utc());
        assert_eq!(hits, vec![&late]);

        let tomorrow = LogicalRange::single(today.succ());
        assert_eq!(filter_by_logical_range(&records, &tomorrow, utc()), vec![&early]);
    }

    #[test]
    fn daily_totals_group_by_logical_day() {
        let t = fixed_now();
        let records = vec![
            session(Subject::Physics, t, 60, 10),
            session(Subject::Chemistry, t + Duration::hours(4), 30, 5),
            session(Subject::Chemistry, t + Duration::hours(8), 30, 5),
        ];
        let totals = daily_totals(&records, utc());
        let today = LogicalDay::of(t, utc());
        assert_eq!(
            totals[&today],
            DayTotals {
                study_secs: 90 * 60,
                questions: 15
            }
        );
        assert_eq!(totals[&today.succ()].questions, 5);
    }
}
