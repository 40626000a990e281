use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::datastore::{Slot, TaskStore};
use crate::filter::TaskQuery;
use crate::form::{FormIntent, TaskForm};
use crate::notify::{Notification, Notifier};
use crate::stats::TaskStats;
use crate::task::{DUE_SOON_DAYS, Task};

/// A task as the list shows it, with its deadline flags resolved.
#[derive(Debug, Clone, Copy)]
pub struct TaskView<'a> {
    pub task: &'a Task,
    pub overdue: bool,
    pub due_soon: bool,
}

/// The task page: store, current query, and the notifications every change
/// produces.
#[derive(Debug)]
pub struct TaskBoard<S: Slot, N: Notifier> {
    store: TaskStore<S>,
    notifier: N,
    pub query: TaskQuery,
    due_soon_window: Duration,
}

impl<S: Slot, N: Notifier> TaskBoard<S, N> {
    pub fn new(store: TaskStore<S>, notifier: N) -> Self {
        Self {
            store,
            notifier,
            query: TaskQuery::default(),
            due_soon_window: Duration::days(DUE_SOON_DAYS),
        }
    }

    pub fn with_due_soon_window(mut self, window: Duration) -> Self {
        self.due_soon_window = window;
        self
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Applies a submitted form. A blank title is a silent no-op and returns
    /// `Ok(None)`.
    #[instrument(skip(self, form, now), fields(editing = ?form.editing()))]
    pub fn submit(&mut self, form: &TaskForm, now: DateTime<Utc>) -> anyhow::Result<Option<&Task>> {
        let Some(intent) = form.submit() else {
            debug!("form submit ignored");
            return Ok(None);
        };

        let task = match intent {
            FormIntent::Create(draft) => {
                let task = self.store.create(draft, now)?;
                info!(id = %task.id, "task created");
                self.notifier.notify(Notification::normal(
                    "Task created",
                    "Your task has been added successfully.",
                ));
                task
            }
            FormIntent::Update { id, patch } => {
                let task = self.store.update(&id, &patch)?;
                info!(id = %task.id, "task updated");
                self.notifier.notify(updated_notice());
                task
            }
        };
        Ok(Some(task))
    }

    #[instrument(skip(self))]
    pub fn toggle(&mut self, id: &str) -> anyhow::Result<&Task> {
        let task = self.store.toggle(id)?;
        info!(id = %task.id, completed = task.completed, "task toggled");
        self.notifier.notify(updated_notice());
        Ok(task)
    }

    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> anyhow::Result<Task> {
        let removed = self.store.delete(id)?;
        info!(id = %removed.id, "task deleted");
        self.notifier.notify(Notification::destructive(
            "Task deleted",
            "Your task has been removed.",
        ));
        Ok(removed)
    }

    pub fn visible(&self, now: DateTime<Utc>) -> Vec<TaskView<'_>> {
        self.query
            .apply(self.store.tasks())
            .into_iter()
            .map(|task| TaskView {
                task,
                overdue: task.is_overdue(now),
                due_soon: task.is_due_soon_within(now, self.due_soon_window),
            })
            .collect()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        TaskStats::compute_within(self.store.tasks(), now, self.due_soon_window)
    }

    /// Message for an empty list, or `None` when something is visible.
    pub fn empty_hint(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if self.store.is_empty() {
            Some("Create your first task to get started!")
        } else if self.visible(now).is_empty() {
            Some("Try adjusting your search or filters.")
        } else {
            None
        }
    }
}

fn updated_notice() -> Notification {
    Notification::normal("Task updated", "Your task has been updated successfully.")
}
