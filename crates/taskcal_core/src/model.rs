use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub type TaskId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    #[default]
    None,
    Daily,
    Weekly,
    Fortnightly,
}

impl RepeatType {
    pub fn needs_repeat_day(self) -> bool {
        matches!(self, RepeatType::Weekly | RepeatType::Fortnightly)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// First day the task can be due.
    pub start_date: NaiveDate,
    #[serde(default)]
    pub repeat_type: RepeatType,
    /// 0 = Sunday through 6 = Saturday. Only read for weekly and fortnightly tasks.
    #[serde(default)]
    pub repeat_day: Option<u8>,
    #[serde(default, alias = "order")]
    pub sort_order: i64,
}

impl Task {
    /// The weekday a weekly or fortnightly task lands on.
    pub fn recurring_weekday(&self) -> CoreResult<u8> {
        match self.repeat_day {
            Some(day) if day < 7 => Ok(day),
            other => Err(CoreError::InvalidRecurrenceConfig {
                task_id: self.id.clone(),
                repeat_type: self.repeat_type,
                repeat_day: other,
            }),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidTask(format!(
                "task `{}` has an empty title",
                self.id
            )));
        }
        if self.repeat_type.needs_repeat_day() {
            self.recurring_weekday()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCompletion {
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSkip {
    pub task_id: TaskId,
    pub date: NaiveDate,
}

/// Fields accepted when creating a task. The store assigns the id and order key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub repeat_type: RepeatType,
    #[serde(default)]
    pub repeat_day: Option<u8>,
}

/// Editable fields of an existing task. The start date is fixed once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: String,
    pub repeat_type: RepeatType,
    pub repeat_day: Option<u8>,
}

impl TaskUpdate {
    pub fn apply_to(&self, task: &mut Task) {
        task.title = self.title.trim().to_string();
        task.repeat_type = self.repeat_type;
        task.repeat_day = if self.repeat_type.needs_repeat_day() {
            self.repeat_day
        } else {
            None
        };
    }
}

/// Everything the engine reads for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completions: Vec<TaskCompletion>,
    #[serde(default)]
    pub skips: Vec<TaskSkip>,
}

impl Snapshot {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Tasks sorted by their order key, ties broken by id.
    pub fn ordered_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks
    }
}
