use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{RepeatType, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Completion,
    Skip,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Completion => f.write_str("completion"),
            RecordKind::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Weekly and fortnightly tasks need a weekday in `0..=6`.
    #[error("task `{task_id}` repeats {repeat_type:?} but has repeat_day {repeat_day:?}")]
    InvalidRecurrenceConfig {
        task_id: TaskId,
        repeat_type: RepeatType,
        repeat_day: Option<u8>,
    },
    #[error("{count} {kind} records for task `{task_id}` on {date}")]
    InconsistentRecord {
        task_id: TaskId,
        date: NaiveDate,
        kind: RecordKind,
        count: usize,
    },
    #[error("{days} days from {from} falls outside the supported calendar")]
    DateOutOfRange { from: NaiveDate, days: i64 },
    #[error("task `{0}` not found")]
    TaskNotFound(TaskId),
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
