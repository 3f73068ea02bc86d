//! Client for a remote task collection exposed over REST.
//!
//! The store is a plain CRUD resource rooted at a single collection URL:
//!
//! - `GET {base}` lists every task
//! - `POST {base}` creates a task and returns the stored representation
//! - `PUT {base}/{id}` replaces a task
//! - `DELETE {base}/{id}` removes a task
//!
//! [`TaskStore`] is the seam the rest of the workspace programs against.
//! [`HttpTaskStore`] talks to a real server, [`InMemoryTaskStore`] keeps
//! everything in process for offline use and tests.

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod memory;
pub mod model;

pub use error::{StoreError, StoreResult};
pub use http::{DEFAULT_BASE_URL, HttpTaskStore, HttpTaskStoreBuilder};
pub use memory::InMemoryTaskStore;
pub use model::{TaskId, TaskRecord};

/// The four operations of a remote task collection.
///
/// Implementations are stateless from the caller's point of view: no
/// retries, no caching, and every call resolves exactly once.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch every task in whatever order the store returns them.
    async fn list(&self) -> StoreResult<Vec<TaskRecord>>;

    /// Submit a new task. Any id on `record` is dropped before sending.
    async fn create(&self, record: TaskRecord) -> StoreResult<TaskRecord>;

    /// Replace the task identified by `record.id`.
    ///
    /// Returns [`StoreError::MissingId`] without touching the network when
    /// the record has no id.
    async fn update(&self, record: TaskRecord) -> StoreResult<TaskRecord>;

    /// Remove the task with the given id.
    async fn delete(&self, id: &TaskId) -> StoreResult<()>;
}
