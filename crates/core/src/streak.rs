//! Daily streak evaluation.
//!
//! The engine is a pure transition `state -> state` over logical days. It is
//! re-run whenever the session set changes and only ever looks one day back:
//! edits to sessions older than yesterday do not rewrite history unless the
//! caller explicitly asks for a [`replay`].

use std::collections::BTreeMap;

use crate::aggregate::DayTotals;
use crate::day::{LogicalDay, LogicalRange};
use crate::model::{StreakDay, StreakSettings, StreakState};

/// True if the day's totals meet both thresholds.
#[must_use]
pub fn qualifies(totals: &DayTotals, settings: &StreakSettings) -> bool {
    totals.study_hours() >= settings.min_study_hours()
        && totals.questions >= u64::from(settings.min_questions())
}

fn qualified_on(
    totals: &BTreeMap<LogicalDay, DayTotals>,
    day: LogicalDay,
    settings: &StreakSettings,
) -> bool {
    qualifies(&totals.get(&day).copied().unwrap_or_default(), settings)
}

/// Evaluate `today` against the daily totals and return the next state.
///
/// Rules, in order:
/// 1. A credited yesterday that no longer qualifies breaks the streak.
/// 2. A qualifying today keeps its count if already credited, extends
///    yesterday's run if yesterday was credited and qualifies, and otherwise
///    starts a new run at 1.
/// 3. A non-qualifying today shows a current streak of 0; if today had been
///    credited by an earlier evaluation the credit falls back to yesterday.
/// 4. The longest streak never decreases and today's history entry is upserted.
#[must_use]
pub fn evaluate(
    state: &StreakState,
    totals: &BTreeMap<LogicalDay, DayTotals>,
    today: LogicalDay,
    settings: &StreakSettings,
) -> StreakState {
    let yesterday = today.pred();
    let yesterday_ok = qualified_on(totals, yesterday, settings);
    let today_ok = qualified_on(totals, today, settings);
    let mut next = state.clone();

    if next.last_streak_day() == Some(yesterday) && !yesterday_ok {
        next.set_current(0);
    }

    let streak = if today_ok {
        if next.last_streak_day() == Some(today) {
            next.entry(today).map_or(next.current(), |e| e.streak.max(1))
        } else if next.last_streak_day() == Some(yesterday) && yesterday_ok {
            let carried = next.entry(yesterday).map_or(next.current(), |e| e.streak);
            carried.saturating_add(1)
        } else {
            1
        }
    } else {
        if next.last_streak_day() == Some(today) {
            let fallback = next
                .entry(yesterday)
                .filter(|e| e.qualified && e.streak > 0)
                .map(|e| e.day);
            next.set_last_streak_day(fallback);
        }
        0
    };

    if today_ok {
        next.set_last_streak_day(Some(today));
    }
    next.set_current(streak);
    next.upsert(StreakDay {
        day: today,
        qualified: today_ok,
        streak,
    });
    next
}

/// Rebuild a state from scratch by evaluating every day of `range` in order.
///
/// This rewrites the whole history for the range; normal updates go through
/// [`evaluate`] only.
#[must_use]
pub fn replay(
    totals: &BTreeMap<LogicalDay, DayTotals>,
    range: &LogicalRange,
    settings: &StreakSettings,
) -> StreakState {
    range
        .days()
        .fold(StreakState::default(), |state, day| {
            evaluate(&state, totals, day, settings)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> LogicalDay {
        LogicalDay::from_date(NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
    }

    fn pass() -> DayTotals {
        DayTotals {
            study_secs: 10 * 3600,
            questions: 60,
        }
    }

    fn fail() -> DayTotals {
        DayTotals {
            study_secs: 9 * 3600,
            questions: 200,
        }
    }

    fn totals(pattern: &[bool]) -> BTreeMap<LogicalDay, DayTotals> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, ok)| {
                let d = day(u32::try_from(i).unwrap() + 1);
                (d, if *ok { pass() } else { fail() })
            })
            .collect()
    }

    #[test]
    fn thresholds_are_inclusive_and_both_required() {
        let settings = StreakSettings::default();
        assert!(qualifies(&pass(), &settings));
        assert!(!qualifies(&fail(), &settings));
        let few_questions = DayTotals {
            study_secs: 12 * 3600,
            questions: 59,
        };
        assert!(!qualifies(&few_questions, &settings));
    }

    #[test]
    fn scenario_gap_resets_and_restarts() {
        let settings = StreakSettings::default();
        let totals = totals(&[true, true, false, true, true]);
        let mut state = StreakState::default();
        let mut seen = Vec::new();
        for d in 1..=5 {
            state = evaluate(&state, &totals, day(d), &settings);
            seen.push(state.current());
        }
        assert_eq!(seen, vec![1, 2, 0, 1, 2]);
        assert_eq!(state.longest(), 2);
        assert_eq!(state.history().len(), 5);
        assert!(!state.entry(day(3)).unwrap().qualified);
    }

    #[test]
    fn re_evaluating_same_day_does_not_double_count() {
        let settings = StreakSettings::default();
        let totals = totals(&[true, true]);
        let mut state = evaluate(&StreakState::default(), &totals, day(1), &settings);
        state = evaluate(&state, &totals, day(2), &settings);
        let again = evaluate(&state, &totals, day(2), &settings);
        assert_eq!(again.current(), 2);
        assert_eq!(again.history().len(), 2);
        assert_eq!(again, evaluate(&again, &totals, day(2), &settings));
    }

    #[test]
    fn morning_before_qualifying_keeps_yesterdays_run() {
        let settings = StreakSettings::default();
        let mut data = totals(&[true, true]);
        let state = evaluate(&StreakState::default(), &data, day(1), &settings);
        let state = evaluate(&state, &data, day(2), &settings);

        // Day 3 starts empty, then the user finishes the day's work.
        let morning = evaluate(&state, &data, day(3), &settings);
        assert_eq!(morning.current(), 0);
        assert_eq!(morning.last_streak_day(), Some(day(2)));

        data.insert(day(3), pass());
        let evening = evaluate(&morning, &data, day(3), &settings);
        assert_eq!(evening.current(), 3);
        assert_eq!(evening.longest(), 3);
        assert_eq!(evening.history().len(), 3);
    }

    #[test]
    fn credited_yesterday_that_no_longer_qualifies_breaks_streak() {
        let settings = StreakSettings::default();
        let mut data = totals(&[true, true]);
        let state = evaluate(&StreakState::default(), &data, day(1), &settings);
        let state = evaluate(&state, &data, day(2), &settings);

        // Sessions from day 2 are deleted before day 3 is evaluated.
        data.insert(day(2), fail());
        data.insert(day(3), pass());
        let next = evaluate(&state, &data, day(3), &settings);
        assert_eq!(next.current(), 1);
        assert_eq!(next.longest(), 2);
    }

    #[test]
    fn revoked_today_falls_back_to_yesterday() {
        let settings = StreakSettings::default();
        let mut data = totals(&[true, true]);
        let state = evaluate(&StreakState::default(), &data, day(1), &settings);
        let state = evaluate(&state, &data, day(2), &settings);
        assert_eq!(state.last_streak_day(), Some(day(2)));

        data.insert(day(2), fail());
        let revoked = evaluate(&state, &data, day(2), &settings);
        assert_eq!(revoked.current(), 0);
        assert_eq!(revoked.last_streak_day(), Some(day(1)));

        data.insert(day(2), pass());
        let restored = evaluate(&revoked, &data, day(2), &settings);
        assert_eq!(restored.current(), 2);
    }

    #[test]
    fn skipped_evaluation_days_do_not_chain() {
        let settings = StreakSettings::default();
        let data = totals(&[true, true, true]);
        let state = evaluate(&StreakState::default(), &data, day(1), &settings);
        // Day 2 was never evaluated, so day 3 has no credited predecessor.
        let state = evaluate(&state, &data, day(3), &settings);
        assert_eq!(state.current(), 1);
    }

    #[test]
    fn replay_matches_step_by_step_evaluation() {
        let settings = StreakSettings::default();
        let data = totals(&[true, false, true, true, true]);
        let range = LogicalRange::new(day(1), day(5));
        let replayed = replay(&data, &range, &settings);
        assert_eq!(replayed.current(), 3);
        assert_eq!(replayed.longest(), 3);
        assert_eq!(
            replayed.history().iter().map(|e| e.streak).collect::<Vec<_>>(),
            vec![1, 0, 1, 2, 3]
        );
    }

    #[test]
    fn saturated_streak_does_not_overflow() {
        let settings = StreakSettings::default();
        let data = totals(&[true, true]);
        let state = StreakState::from_persisted(
            u32::MAX,
            u32::MAX,
            Some(day(1)),
            vec![StreakDay {
                day: day(1),
                qualified: true,
                streak: u32::MAX,
            }],
        );
        let next = evaluate(&state, &data, day(2), &settings);
        assert_eq!(next.current(), u32::MAX);
        assert_eq!(next.longest(), u32::MAX);
    }
}
