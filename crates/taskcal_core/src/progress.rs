use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, RecordKind};
use crate::model::{Task, TaskCompletion, TaskId, TaskSkip};
use crate::recurrence;

/// How a single task stands on a single day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskDayState {
    NotDue,
    Skipped,
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Empty,
    Complete,
    Partial,
    Upcoming,
    Overdue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DayProgress {
    pub status: DayStatus,
    /// `completed / due`, 0 when nothing is due.
    pub progress: f64,
    pub due: usize,
    pub completed: usize,
}

/// Completion and skip records keyed by task and day.
///
/// Duplicate records for the same pair are resolved in favour of the one
/// supplied last; each duplicate pair is kept in [`RecordIndex::conflicts`].
#[derive(Debug, Default)]
pub struct RecordIndex {
    completions: HashMap<TaskId, HashMap<NaiveDate, bool>>,
    skips: HashMap<TaskId, HashSet<NaiveDate>>,
    conflicts: Vec<CoreError>,
}

impl RecordIndex {
    pub fn build(completions: &[TaskCompletion], skips: &[TaskSkip]) -> Self {
        let mut index = RecordIndex::default();
        let mut completion_counts: BTreeMap<(&str, NaiveDate), usize> = BTreeMap::new();
        let mut skip_counts: BTreeMap<(&str, NaiveDate), usize> = BTreeMap::new();

        for record in completions {
            index
                .completions
                .entry(record.task_id.clone())
                .or_default()
                .insert(record.date, record.completed);
            *completion_counts
                .entry((record.task_id.as_str(), record.date))
                .or_default() += 1;
        }
        for record in skips {
            index
                .skips
                .entry(record.task_id.clone())
                .or_default()
                .insert(record.date);
            *skip_counts
                .entry((record.task_id.as_str(), record.date))
                .or_default() += 1;
        }

        for (kind, counts) in [
            (RecordKind::Completion, completion_counts),
            (RecordKind::Skip, skip_counts),
        ] {
            for ((task_id, date), count) in counts {
                if count > 1 {
                    tracing::warn!(task_id, %date, %kind, count, "inconsistent task records");
                    index.conflicts.push(CoreError::InconsistentRecord {
                        task_id: task_id.to_string(),
                        date,
                        kind,
                        count,
                    });
                }
            }
        }

        index
    }

    pub fn conflicts(&self) -> &[CoreError] {
        &self.conflicts
    }

    pub fn is_skipped(&self, task_id: &str, day: NaiveDate) -> bool {
        self.skips
            .get(task_id)
            .is_some_and(|days| days.contains(&day))
    }

    pub fn is_completed(&self, task_id: &str, day: NaiveDate) -> bool {
        self.completions
            .get(task_id)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(false)
    }

    pub fn task_state(&self, task: &Task, day: NaiveDate) -> CoreResult<TaskDayState> {
        if !recurrence::is_due(task, day)? {
            return Ok(TaskDayState::NotDue);
        }
        if self.is_skipped(&task.id, day) {
            return Ok(TaskDayState::Skipped);
        }
        if self.is_completed(&task.id, day) {
            return Ok(TaskDayState::Completed);
        }
        Ok(TaskDayState::Pending)
    }

    pub fn day_progress(
        &self,
        tasks: &[Task],
        day: NaiveDate,
        today: NaiveDate,
    ) -> CoreResult<DayProgress> {
        let mut due = 0usize;
        let mut completed = 0usize;
        for task in tasks {
            match self.task_state(task, day)? {
                TaskDayState::NotDue | TaskDayState::Skipped => {}
                TaskDayState::Completed => {
                    due += 1;
                    completed += 1;
                }
                TaskDayState::Pending => due += 1,
            }
        }
        Ok(summarize(due, completed, day, today))
    }
}

/// Aggregates every task's state on `day` into a status and completion fraction.
pub fn day_progress(
    tasks: &[Task],
    completions: &[TaskCompletion],
    skips: &[TaskSkip],
    day: NaiveDate,
    today: NaiveDate,
) -> CoreResult<DayProgress> {
    RecordIndex::build(completions, skips).day_progress(tasks, day, today)
}

/// Fails with the first duplicated (task, day) record, if any.
pub fn validate_records(completions: &[TaskCompletion], skips: &[TaskSkip]) -> CoreResult<()> {
    match RecordIndex::build(completions, skips).conflicts.into_iter().next() {
        Some(conflict) => Err(conflict),
        None => Ok(()),
    }
}

fn summarize(due: usize, completed: usize, day: NaiveDate, today: NaiveDate) -> DayProgress {
    let status = if due == 0 {
        DayStatus::Empty
    } else if completed == due {
        DayStatus::Complete
    } else if day > today {
        DayStatus::Upcoming
    } else if day < today {
        DayStatus::Overdue
    } else {
        DayStatus::Partial
    };
    let progress = if due == 0 {
        0.0
    } else {
        completed as f64 / due as f64
    };
    DayProgress {
        status,
        progress,
        due,
        completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepeatType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(id: &str, start: NaiveDate) -> Task {
        Task {
            id: id.into(),
            title: id.to_uppercase(),
            start_date: start,
            repeat_type: RepeatType::Daily,
            repeat_day: None,
            sort_order: 0,
        }
    }

    fn done(id: &str, day: NaiveDate) -> TaskCompletion {
        TaskCompletion {
            task_id: id.into(),
            date: day,
            completed: true,
        }
    }

    fn skip(id: &str, day: NaiveDate) -> TaskSkip {
        TaskSkip {
            task_id: id.into(),
            date: day,
        }
    }

    #[test]
    fn half_done_today_is_partial() {
        let today = date(2025, 10, 22);
        let tasks = [daily("a", today), daily("b", today)];
        let result = day_progress(&tasks, &[done("a", today)], &[], today, today).unwrap();
        assert_eq!(result.status, DayStatus::Partial);
        assert_eq!(result.progress, 0.5);
        assert_eq!((result.due, result.completed), (2, 1));
    }

    #[test]
    fn skipped_only_task_leaves_day_empty() {
        let today = date(2025, 10, 22);
        let tasks = [daily("a", today)];
        let result = day_progress(&tasks, &[], &[skip("a", today)], today, today).unwrap();
        assert_eq!(result.status, DayStatus::Empty);
        assert_eq!(result.progress, 0.0);
        assert_eq!(result.due, 0);
    }

    #[test]
    fn skip_overrides_completion() {
        let today = date(2025, 10, 22);
        let tasks = [daily("a", today)];
        let result = day_progress(
            &tasks,
            &[done("a", today)],
            &[skip("a", today)],
            today,
            today,
        )
        .unwrap();
        assert_eq!(result.status, DayStatus::Empty);
        assert_eq!(result.progress, 0.0);
        assert_eq!((result.due, result.completed), (0, 0));

        let index = RecordIndex::build(&[done("a", today)], &[skip("a", today)]);
        assert_eq!(index.task_state(&tasks[0], today).unwrap(), TaskDayState::Skipped);
    }

    #[test]
    fn pending_past_day_is_overdue_and_future_is_upcoming() {
        let today = date(2025, 10, 22);
        let tasks = [daily("a", date(2025, 10, 1))];
        let past = day_progress(&tasks, &[], &[], date(2025, 10, 21), today).unwrap();
        assert_eq!(past.status, DayStatus::Overdue);
        let future = day_progress(&tasks, &[], &[], date(2025, 10, 23), today).unwrap();
        assert_eq!(future.status, DayStatus::Upcoming);
        assert_eq!(future.progress, 0.0);
    }

    #[test]
    fn overdue_wins_over_partial_for_past_days() {
        let today = date(2025, 10, 22);
        let yesterday = date(2025, 10, 21);
        let tasks = [daily("a", yesterday), daily("b", yesterday)];
        let result = day_progress(&tasks, &[done("a", yesterday)], &[], yesterday, today).unwrap();
        assert_eq!(result.status, DayStatus::Overdue);
        assert_eq!(result.progress, 0.5);
    }

    #[test]
    fn all_done_is_complete_regardless_of_date() {
        let today = date(2025, 10, 22);
        let tomorrow = date(2025, 10, 23);
        let tasks = [daily("a", today), daily("b", today)];
        let records = [done("a", tomorrow), done("b", tomorrow)];
        let result = day_progress(&tasks, &records, &[], tomorrow, today).unwrap();
        assert_eq!(result.status, DayStatus::Complete);
        assert_eq!(result.progress, 1.0);
    }

    #[test]
    fn all_pending_today_is_partial() {
        let today = date(2025, 10, 22);
        let result = day_progress(&[daily("a", today)], &[], &[], today, today).unwrap();
        assert_eq!(result.status, DayStatus::Partial);
        assert_eq!(result.progress, 0.0);
    }

    #[test]
    fn records_for_days_the_task_is_not_due_are_ignored() {
        let today = date(2025, 10, 22);
        let before_start = date(2025, 10, 20);
        let tasks = [daily("a", today)];
        let result = day_progress(&tasks, &[done("a", before_start)], &[], before_start, today)
            .unwrap();
        assert_eq!(result.status, DayStatus::Empty);
    }

    #[test]
    fn unchecked_completion_counts_as_pending() {
        let today = date(2025, 10, 22);
        let record = TaskCompletion {
            task_id: "a".into(),
            date: today,
            completed: false,
        };
        let index = RecordIndex::build(&[record], &[]);
        assert_eq!(
            index.task_state(&daily("a", today), today).unwrap(),
            TaskDayState::Pending
        );
    }

    #[test]
    fn duplicate_records_resolve_to_last_and_are_reported() {
        let today = date(2025, 10, 22);
        let records = [
            done("a", today),
            TaskCompletion {
                task_id: "a".into(),
                date: today,
                completed: false,
            },
        ];
        let index = RecordIndex::build(&records, &[skip("b", today), skip("b", today)]);
        assert!(!index.is_completed("a", today));
        assert_eq!(index.conflicts().len(), 2);

        let err = validate_records(&records, &[]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InconsistentRecord {
                kind: RecordKind::Completion,
                count: 2,
                ..
            }
        ));
        assert!(validate_records(&[done("a", today)], &[skip("a", today)]).is_ok());
    }

    #[test]
    fn invalid_recurrence_surfaces_from_day_progress() {
        let today = date(2025, 10, 22);
        let mut broken = daily("a", today);
        broken.repeat_type = RepeatType::Weekly;
        assert!(day_progress(&[broken], &[], &[], today, today).is_err());
    }
}
