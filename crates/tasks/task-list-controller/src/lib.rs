//! Client-side task list with optimistic mutation against a remote store.
//!
//! [`TaskListController`] owns the ordered list of [`Task`]s, the creation
//! and edit forms, and the toggle/delete workflow. Local changes happen
//! immediately; store calls run in the background and report back as
//! [`Completion`]s, which the [`ConsistencyPolicy`] either just logs or
//! uses to undo the local change.
//!
//! ```no_run
//! use std::sync::Arc;
//! use task_list_controller::TaskListController;
//! use task_store_client::HttpTaskStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpTaskStore::builder()
//!     .base_url("http://localhost:3000/api/tasks")
//!     .build()?;
//! let mut controller = TaskListController::new(Arc::new(store));
//! controller.load().await?;
//!
//! let form = controller.create_form_mut();
//! form.title = "Buy milk".to_string();
//! form.description = "At the store".to_string();
//! form.image_url = "https://example.com/milk.png".to_string();
//! controller.submit_create()?;
//!
//! controller.toggle(0)?;
//! controller.settle().await;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod form;
pub mod policy;
pub mod task;

pub use controller::{Completion, EditSession, FormerSlot, TaskListController, UpdateUndo};
pub use error::{ControllerError, ControllerResult};
pub use form::{FieldError, FieldProblem, FormErrors, FormField, TaskForm};
pub use policy::ConsistencyPolicy;
pub use task::{DELETE_LABEL, PLACEHOLDER_IMAGE_URL, Presentation, Task, TaskDetails, TaskStatus};
