//! In-process task store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::TaskStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{TaskId, TaskRecord};

/// Task store that keeps records in memory.
///
/// Ids are handed out as increasing integers. Flipping [`set_failing`]
/// makes every call fail with [`StoreError::Unavailable`], which is how the
/// offline mode and tests simulate an unreachable server.
///
/// [`set_failing`]: InMemoryTaskStore::set_failing
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    records: Mutex<Vec<TaskRecord>>,
    failing: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. Records without an id get one assigned.
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let mut seeded = Vec::with_capacity(records.len());
        for mut record in records {
            if record.id.is_none() {
                record.id = Some(next_id(&seeded));
            }
            seeded.push(record);
        }

        Self {
            records: Mutex::new(seeded),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of everything currently stored.
    pub async fn snapshot(&self) -> Vec<TaskRecord> {
        self.records.lock().await.clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

fn next_id(records: &[TaskRecord]) -> TaskId {
    let max = records
        .iter()
        .filter_map(|r| r.id.as_ref().and_then(TaskId::as_numeric))
        .max()
        .unwrap_or(0);
    TaskId::from(max + 1)
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list(&self) -> StoreResult<Vec<TaskRecord>> {
        self.check_available()?;
        Ok(self.records.lock().await.clone())
    }

    async fn create(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        self.check_available()?;
        let mut records = self.records.lock().await;
        let mut record = record.without_id();
        record.id = Some(next_id(&records));
        debug!("Stored task {:?} in memory", record.id);
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        let id = record.id.clone().ok_or(StoreError::MissingId)?;
        self.check_available()?;
        let mut records = self.records.lock().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id.as_ref() == Some(&id))
            .ok_or_else(|| StoreError::Status {
                status: 404,
                body: format!("task {id} not found"),
            })?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<()> {
        self.check_available()?;
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id.as_ref() != Some(id));
        if records.len() == before {
            return Err(StoreError::Status {
                status: 404,
                body: format!("task {id} not found"),
            });
        }
        Ok(())
    }
}
