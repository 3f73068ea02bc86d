//! Controller error types.

use task_store_client::{StoreError, TaskId};
use thiserror::Error;

use crate::form::FormErrors;

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Form is invalid: {0}")]
    Invalid(FormErrors),

    #[error("Task has no id and cannot be sent to the store")]
    MissingId,

    #[error("No task at index {0}")]
    NoSuchTask(usize),

    #[error("Task {0} is no longer in the list")]
    UnknownTask(TaskId),

    #[error("No edit in progress")]
    NotEditing,

    #[error("Task store error: {0}")]
    Store(#[from] StoreError),
}
