use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::form::{TaskDraft, TaskPatch};
use crate::task::Task;

/// A single named key-value slot holding the serialized collection.
pub trait Slot {
    fn name(&self) -> &str;

    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> anyhow::Result<Option<String>>;

    fn write(&mut self, payload: &str) -> anyhow::Result<()>;
}

/// One JSON file per slot, `<dir>/<name>.json`, replaced atomically.
#[derive(Debug, Clone)]
pub struct FileSlot {
    name: String,
    path: PathBuf,
}

impl FileSlot {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, name: &str) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join(format!("{name}.json"));
        info!(slot = name, file = %path.display(), "opened slot");
        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Slot for FileSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed reading {}", self.path.display()))
            }
        }
    }

    #[tracing::instrument(skip(self, payload), fields(file = %self.path.display()))]
    fn write(&mut self, payload: &str) -> anyhow::Result<()> {
        debug!(bytes = payload.len(), "writing slot atomically");
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(payload.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

/// In-process slot, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    name: String,
    value: Option<String>,
    writes: usize,
}

impl MemorySlot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_value(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.into()),
            writes: 0,
        }
    }

    /// Number of completed writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Slot for MemorySlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> anyhow::Result<Option<String>> {
        Ok(self.value.clone())
    }

    fn write(&mut self, payload: &str) -> anyhow::Result<()> {
        self.value = Some(payload.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Owned, ordered task collection mirrored to a [`Slot`].
///
/// Every mutation rewrites the whole slot before it is committed in memory.
#[derive(Debug)]
pub struct TaskStore<S: Slot> {
    slot: S,
    tasks: Vec<Task>,
}

impl<S: Slot> TaskStore<S> {
    /// Loads the slot once. Missing, unreadable or malformed content yields an
    /// empty collection.
    #[tracing::instrument(skip(slot), fields(slot = slot.name()))]
    pub fn open(slot: S) -> Self {
        let tasks = match slot.read() {
            Ok(Some(raw)) if raw.trim().is_empty() => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "stored tasks are malformed; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("slot is empty");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed reading stored tasks; starting empty");
                Vec::new()
            }
        };

        info!(count = tasks.len(), "loaded tasks");
        Self { slot, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Millisecond timestamp of `now`, bumped until unused.
    pub fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut candidate = now.timestamp_millis();
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }

    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<&Task> {
        if !draft.has_title() {
            bail!("task title cannot be empty");
        }

        let task = Task {
            id: self.next_id(now),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            deadline: draft.deadline,
            completed: false,
            created_at: now,
        };
        debug!(id = %task.id, "creating task");

        let mut next = self.tasks.clone();
        next.push(task);
        self.commit(next)?;
        self.tasks
            .last()
            .ok_or_else(|| anyhow!("task vanished after create"))
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> anyhow::Result<&Task> {
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            bail!("task title cannot be empty");
        }

        let idx = self.position(id)?;
        let mut next = self.tasks.clone();
        patch.apply(&mut next[idx]);
        self.commit(next)?;
        Ok(&self.tasks[idx])
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, id: &str) -> anyhow::Result<&Task> {
        let idx = self.position(id)?;
        let patch = TaskPatch::completed(!self.tasks[idx].completed);
        self.update(id, &patch)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> anyhow::Result<Task> {
        let idx = self.position(id)?;
        let mut next = self.tasks.clone();
        let removed = next.remove(idx);
        self.commit(next)?;
        Ok(removed)
    }

    fn position(&self, id: &str) -> anyhow::Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))
    }

    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&next).context("failed to serialize tasks")?;
        self.slot
            .write(&payload)
            .with_context(|| format!("failed to write slot {}", self.slot.name()))?;
        debug!(count = next.len(), "persisted tasks");
        self.tasks = next;
        Ok(())
    }
}
