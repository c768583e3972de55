use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    calendar::{self, CalendarView, ScrollBounds},
    model::{NewTask, Snapshot, Task, TaskId, TaskUpdate},
    notifications::{Feedback, FeedbackSink},
    progress::{DayProgress, RecordIndex, TaskDayState},
    store::TaskStore,
};

/// A task that is due on the day being inspected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgendaEntry {
    pub task: Task,
    pub state: TaskDayState,
}

pub struct TaskService {
    store: Box<dyn TaskStore>,
    snapshot: RwLock<Snapshot>,
    feedback_sink: Option<Box<dyn FeedbackSink>>,
}

#[derive(Default)]
pub struct TaskServiceBuilder {
    store: Option<Box<dyn TaskStore>>,
    feedback_sink: Option<Box<dyn FeedbackSink>>,
}

impl TaskServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: impl TaskStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_feedback_sink(mut self, sink: Box<dyn FeedbackSink>) -> Self {
        self.feedback_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TaskService> {
        let store = self
            .store
            .ok_or_else(|| anyhow!("task service needs a store"))?;
        let service = TaskService {
            store,
            snapshot: RwLock::new(Snapshot::default()),
            feedback_sink: self.feedback_sink,
        };
        service.reload()?;
        Ok(service)
    }
}

impl TaskService {
    pub fn builder() -> TaskServiceBuilder {
        TaskServiceBuilder::new()
    }

    pub fn reload(&self) -> Result<()> {
        let fresh = self.store.load()?;
        tracing::debug!(
            tasks = fresh.tasks.len(),
            completions = fresh.completions.len(),
            skips = fresh.skips.len(),
            "snapshot loaded"
        );
        *self.snapshot.write() = fresh;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn ordered_tasks(&self) -> Vec<Task> {
        self.snapshot
            .read()
            .ordered_tasks()
            .into_iter()
            .cloned()
            .collect()
    }

    #[instrument(skip(self, task), fields(title = %task.title))]
    pub fn add_task(&self, task: NewTask) -> Result<Task> {
        self.mutate(Some("Task added"), "Failed to add task", |store| {
            store.add_task(task)
        })
    }

    #[instrument(skip(self, update))]
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task> {
        self.mutate(Some("Task updated"), "Failed to update task", |store| {
            store.update_task(id, update)
        })
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.mutate(Some("Task deleted"), "Failed to delete task", |store| {
            store.delete_task(id)
        })
    }

    #[instrument(skip(self))]
    pub fn skip_task_for_date(&self, id: &str, date: NaiveDate) -> Result<()> {
        self.mutate(Some("Task skipped for today"), "Failed to skip task", |store| {
            store.skip_task(id, date)
        })
    }

    #[instrument(skip(self))]
    pub fn unskip_task_for_date(&self, id: &str, date: NaiveDate) -> Result<()> {
        self.mutate(Some("Task restored"), "Failed to restore task", |store| {
            store.unskip_task(id, date)
        })
    }

    #[instrument(skip(self))]
    pub fn toggle_completion(&self, id: &str, date: NaiveDate, completed: bool) -> Result<()> {
        self.mutate(None, "Failed to update task", |store| {
            store.set_completion(id, date, completed)
        })
    }

    #[instrument(skip(self))]
    pub fn reorder_tasks(&self, ordered_ids: &[TaskId]) -> Result<()> {
        self.mutate(None, "Failed to reorder tasks", |store| {
            store.reorder_tasks(ordered_ids)
        })
    }

    pub fn scroll_bounds(&self, today: NaiveDate) -> ScrollBounds {
        ScrollBounds::for_tasks(&self.snapshot.read().tasks, today)
    }

    pub fn calendar(&self, today: NaiveDate, week_offset: i64) -> Result<CalendarView> {
        let snapshot = self.snapshot.read();
        Ok(calendar::calendar_view(&snapshot, today, week_offset)?)
    }

    pub fn day_progress(&self, day: NaiveDate, today: NaiveDate) -> Result<DayProgress> {
        let snapshot = self.snapshot.read();
        let index = RecordIndex::build(&snapshot.completions, &snapshot.skips);
        Ok(index.day_progress(&snapshot.tasks, day, today)?)
    }

    /// Tasks due on `day` in display order, skipped ones included.
    pub fn day_agenda(&self, day: NaiveDate) -> Result<Vec<AgendaEntry>> {
        let snapshot = self.snapshot.read();
        let index = RecordIndex::build(&snapshot.completions, &snapshot.skips);
        let mut entries = Vec::new();
        for task in snapshot.ordered_tasks() {
            let state = index.task_state(task, day)?;
            if state != TaskDayState::NotDue {
                entries.push(AgendaEntry {
                    task: task.clone(),
                    state,
                });
            }
        }
        Ok(entries)
    }
}

impl TaskService {
    fn mutate<T>(
        &self,
        success: Option<&str>,
        failure: &str,
        op: impl FnOnce(&dyn TaskStore) -> Result<T>,
    ) -> Result<T> {
        let value = match op(self.store.as_ref()) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, "{failure}");
                self.notify(Feedback::error(failure));
                return Err(err);
            }
        };
        if let Some(message) = success {
            self.notify(Feedback::success(message));
        }
        // the write already landed; a stale cache is fixed by the next reload
        if let Err(err) = self.reload() {
            tracing::warn!(%err, "snapshot refresh after mutation failed");
        }
        Ok(value)
    }

    fn notify(&self, feedback: Feedback) {
        if let Some(sink) = &self.feedback_sink {
            sink.notify(feedback);
        }
    }
}
