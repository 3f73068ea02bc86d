//! The in-memory task and its completion state machine.

use chrono::{DateTime, Utc};
use task_store_client::{TaskId, TaskRecord};
use tracing::debug;

/// Image shown for tasks the store returns without one.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/150";

/// Label of the delete button, identical for every task.
pub const DELETE_LABEL: &str = "Delete task";

/// Completion status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

impl TaskStatus {
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            TaskStatus::Done
        } else {
            TaskStatus::Pending
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// The other state. Both transitions are always allowed.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Pending,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            TaskStatus::Pending => "❌",
            TaskStatus::Done => "✅",
        }
    }

    pub fn toggle_label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Task not done!",
            TaskStatus::Done => "Task done!",
        }
    }
}

/// Display values derived from a task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub glyph: &'static str,
    pub toggle_label: &'static str,
    /// Mirrors `completed`; decides which way the next toggle goes.
    pub user_has_pressed: bool,
    pub delete_label: &'static str,
}

impl From<TaskStatus> for Presentation {
    fn from(status: TaskStatus) -> Self {
        Self {
            glyph: status.glyph(),
            toggle_label: status.toggle_label(),
            user_has_pressed: status.is_done(),
            delete_label: DELETE_LABEL,
        }
    }
}

/// The user-editable fields of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// A task held by the controller.
///
/// Status and presentation cannot disagree: presentation is always derived
/// from the status, and the status only changes through [`Task::toggle`].
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: Option<TaskId>,
    details: TaskDetails,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A freshly created, pending task.
    pub fn new(id: TaskId, details: TaskDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Some(id),
            details,
            status: TaskStatus::Pending,
            created_at,
            updated_at: None,
        }
    }

    /// Build a task from a store record, filling every missing field.
    pub fn from_record(record: TaskRecord) -> Self {
        let created_at = record
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| {
                debug!(id = ?record.id, "Task has no usable createdAt, using now");
                Utc::now()
            });

        Self {
            id: record.id,
            details: TaskDetails {
                title: record.title,
                description: record.description,
                image_url: record
                    .image_url
                    .filter(|url| !url.is_empty())
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            },
            status: TaskStatus::from_completed(record.completed.unwrap_or(false)),
            created_at,
            updated_at: record.updated_at.as_deref().and_then(parse_timestamp),
        }
    }

    /// The full wire record, presentation fields included.
    pub fn to_record(&self) -> TaskRecord {
        let presentation = self.presentation();
        TaskRecord {
            id: self.id.clone(),
            title: self.details.title.clone(),
            description: self.details.description.clone(),
            image_url: Some(self.details.image_url.clone()),
            completed: Some(self.status.is_done()),
            created_at: Some(self.created_at.to_rfc3339()),
            updated_at: self.updated_at.map(|at| at.to_rfc3339()),
            valid: Some(presentation.glyph.to_string()),
            task_button_text: Some(presentation.toggle_label.to_string()),
            user_has_pressed: Some(presentation.user_has_pressed),
            button_delete: Some(presentation.delete_label.to_string()),
        }
    }

    pub fn id(&self) -> Option<&TaskId> {
        self.id.as_ref()
    }

    pub fn details(&self) -> &TaskDetails {
        &self.details
    }

    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn description(&self) -> &str {
        &self.details.description
    }

    pub fn image_url(&self) -> &str {
        &self.details.image_url
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_done()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn presentation(&self) -> Presentation {
        Presentation::from(self.status)
    }

    /// Flip between pending and done.
    pub fn toggle(&mut self) -> TaskStatus {
        self.status = self.status.toggled();
        self.status
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn set_id(&mut self, id: TaskId) {
        self.id = Some(id);
    }

    /// Replace the editable fields, returning what was there before.
    pub(crate) fn apply_details(
        &mut self,
        details: TaskDetails,
        updated_at: Option<DateTime<Utc>>,
    ) -> (TaskDetails, Option<DateTime<Utc>>) {
        let previous_details = std::mem::replace(&mut self.details, details);
        let previous_updated_at = std::mem::replace(&mut self.updated_at, updated_at);
        (previous_details, previous_updated_at)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
}
