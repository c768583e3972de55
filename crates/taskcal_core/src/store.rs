use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{NewTask, Snapshot, Task, TaskCompletion, TaskId, TaskSkip, TaskUpdate};

/// CRUD surface of whatever holds tasks, completions and skips.
pub trait TaskStore: Send + Sync {
    fn load(&self) -> Result<Snapshot>;
    fn add_task(&self, task: NewTask) -> Result<Task>;
    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task>;
    /// Removes the task together with its completions and skips.
    fn delete_task(&self, id: &str) -> Result<()>;
    /// Order keys follow the position in `ordered_ids`; unlisted tasks move after them.
    fn reorder_tasks(&self, ordered_ids: &[TaskId]) -> Result<()>;
    fn set_completion(&self, id: &str, date: NaiveDate, completed: bool) -> Result<()>;
    fn skip_task(&self, id: &str, date: NaiveDate) -> Result<()>;
    fn unskip_task(&self, id: &str, date: NaiveDate) -> Result<()>;
}

/// A store that holds a whole [`Snapshot`] and edits it in place.
pub trait SnapshotBackend: Send + Sync {
    fn read(&self) -> Result<Snapshot>;
    fn modify<T>(&self, edit: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T>;
}

impl<B: SnapshotBackend> TaskStore for B {
    fn load(&self) -> Result<Snapshot> {
        self.read()
    }

    fn add_task(&self, task: NewTask) -> Result<Task> {
        self.modify(|snapshot| edits::add_task(snapshot, task))
    }

    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task> {
        self.modify(|snapshot| edits::update_task(snapshot, id, &update))
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.modify(|snapshot| edits::delete_task(snapshot, id))
    }

    fn reorder_tasks(&self, ordered_ids: &[TaskId]) -> Result<()> {
        self.modify(|snapshot| edits::reorder_tasks(snapshot, ordered_ids))
    }

    fn set_completion(&self, id: &str, date: NaiveDate, completed: bool) -> Result<()> {
        self.modify(|snapshot| edits::set_completion(snapshot, id, date, completed))
    }

    fn skip_task(&self, id: &str, date: NaiveDate) -> Result<()> {
        self.modify(|snapshot| edits::skip_task(snapshot, id, date))
    }

    fn unskip_task(&self, id: &str, date: NaiveDate) -> Result<()> {
        self.modify(|snapshot| edits::unskip_task(snapshot, id, date))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Snapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }
}

impl SnapshotBackend for InMemoryStore {
    fn read(&self) -> Result<Snapshot> {
        Ok(self.data.read().clone())
    }

    fn modify<T>(&self, edit: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut data = self.data.write();
        let mut working = data.clone();
        let out = edit(&mut working)?;
        *data = working;
        Ok(out)
    }
}

/// Keeps the snapshot as pretty-printed JSON. The file is re-read on every call,
/// so edits made by other writers between calls are picked up.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "data file missing, starting empty");
            return Ok(Snapshot::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Snapshot::default());
        }
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn write_file(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let payload = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, payload)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl SnapshotBackend for JsonFileStore {
    fn read(&self) -> Result<Snapshot> {
        self.read_file()
    }

    fn modify<T>(&self, edit: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock();
        let mut snapshot = self.read_file()?;
        let out = edit(&mut snapshot)?;
        self.write_file(&snapshot)?;
        tracing::debug!(
            path = %self.path.display(),
            tasks = snapshot.tasks.len(),
            "data file updated"
        );
        Ok(out)
    }
}

mod edits {
    use super::*;

    fn require_task<'a>(snapshot: &'a mut Snapshot, id: &str) -> Result<&'a mut Task> {
        snapshot
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| CoreError::TaskNotFound(id.to_string()).into())
    }

    pub(super) fn add_task(snapshot: &mut Snapshot, new: NewTask) -> Result<Task> {
        let sort_order = snapshot
            .tasks
            .iter()
            .map(|task| task.sort_order + 1)
            .max()
            .unwrap_or(0);
        let mut task = Task {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            start_date: new.start_date,
            repeat_type: new.repeat_type,
            repeat_day: None,
            sort_order,
        };
        TaskUpdate {
            title: new.title,
            repeat_type: new.repeat_type,
            repeat_day: new.repeat_day,
        }
        .apply_to(&mut task);
        task.validate()?;
        snapshot.tasks.push(task.clone());
        Ok(task)
    }

    pub(super) fn update_task(
        snapshot: &mut Snapshot,
        id: &str,
        update: &TaskUpdate,
    ) -> Result<Task> {
        let task = require_task(snapshot, id)?;
        let mut edited = task.clone();
        update.apply_to(&mut edited);
        edited.validate()?;
        *task = edited.clone();
        Ok(edited)
    }

    pub(super) fn delete_task(snapshot: &mut Snapshot, id: &str) -> Result<()> {
        require_task(snapshot, id)?;
        snapshot.tasks.retain(|task| task.id != id);
        snapshot.completions.retain(|record| record.task_id != id);
        snapshot.skips.retain(|record| record.task_id != id);
        Ok(())
    }

    pub(super) fn reorder_tasks(snapshot: &mut Snapshot, ordered_ids: &[TaskId]) -> Result<()> {
        for id in ordered_ids {
            anyhow::ensure!(
                snapshot.task(id).is_some(),
                CoreError::TaskNotFound(id.clone())
            );
        }
        let unlisted: Vec<TaskId> = snapshot
            .ordered_tasks()
            .into_iter()
            .filter(|task| !ordered_ids.contains(&task.id))
            .map(|task| task.id.clone())
            .collect();
        for (position, id) in ordered_ids.iter().chain(unlisted.iter()).enumerate() {
            require_task(snapshot, id)?.sort_order = position as i64;
        }
        Ok(())
    }

    pub(super) fn set_completion(
        snapshot: &mut Snapshot,
        id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<()> {
        require_task(snapshot, id)?;
        snapshot
            .completions
            .retain(|record| !(record.task_id == id && record.date == date));
        snapshot.completions.push(TaskCompletion {
            task_id: id.to_string(),
            date,
            completed,
        });
        Ok(())
    }

    pub(super) fn skip_task(snapshot: &mut Snapshot, id: &str, date: NaiveDate) -> Result<()> {
        require_task(snapshot, id)?;
        let already = snapshot
            .skips
            .iter()
            .any(|record| record.task_id == id && record.date == date);
        if !already {
            snapshot.skips.push(TaskSkip {
                task_id: id.to_string(),
                date,
            });
        }
        Ok(())
    }

    pub(super) fn unskip_task(snapshot: &mut Snapshot, id: &str, date: NaiveDate) -> Result<()> {
        require_task(snapshot, id)?;
        snapshot
            .skips
            .retain(|record| !(record.task_id == id && record.date == date));
        Ok(())
    }
}
