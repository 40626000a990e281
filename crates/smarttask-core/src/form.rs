use chrono::{DateTime, Utc};
use tracing::debug;

use crate::task::{Category, Priority, Task};

/// Editable task fields as collected by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category,
            priority: task.priority,
            deadline: task.deadline,
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Shallow-merge update. `None` leaves the field as it is; for the optional
/// fields `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Option<Category>>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

impl From<TaskDraft> for TaskPatch {
    fn from(draft: TaskDraft) -> Self {
        Self {
            title: Some(draft.title),
            description: Some(draft.description),
            category: Some(draft.category),
            priority: Some(draft.priority),
            deadline: Some(draft.deadline),
            completed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormIntent {
    Create(TaskDraft),
    Update { id: String, patch: TaskPatch },
}

/// Create/edit form state. In edit mode the draft starts as a copy of the
/// task being edited.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub draft: TaskDraft,
    editing: Option<String>,
}

impl TaskForm {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            draft: TaskDraft::from_task(task),
            editing: Some(task.id.clone()),
        }
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn heading(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Task"
        } else {
            "Create New Task"
        }
    }

    /// `None` when the title is blank; the caller must not act on it.
    pub fn submit(&self) -> Option<FormIntent> {
        if !self.draft.has_title() {
            debug!(editing = ?self.editing, "rejecting submit with blank title");
            return None;
        }

        let draft = self.draft.clone();
        Some(match &self.editing {
            Some(id) => FormIntent::Update {
                id: id.clone(),
                patch: draft.into(),
            },
            None => FormIntent::Create(draft),
        })
    }
}
