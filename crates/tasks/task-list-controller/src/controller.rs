//! Task list controller.
//!
//! Every user action mutates the local list synchronously and then fires
//! the matching store call on a background task. Outcomes come back as
//! [`Completion`]s over a channel owned by the controller, so the list is
//! only ever touched from whoever owns the controller. What a failed call
//! does to the list is decided by the [`ConsistencyPolicy`].
//!
//! Under rollback, updates of one task are undone newest first, so any mix
//! of failed toggles and edits unwinds to the last state the store saw.
//! A deleted task goes back next to the neighbours it had.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use task_store_client::{StoreResult, TaskId, TaskRecord, TaskStore};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{ControllerError, ControllerResult};
use crate::form::TaskForm;
use crate::policy::ConsistencyPolicy;
use crate::task::{Task, TaskDetails, TaskStatus};

/// Local state to restore if an update has to be undone.
#[derive(Debug, Clone)]
pub enum UpdateUndo {
    Status(TaskStatus),
    Details {
        details: TaskDetails,
        updated_at: Option<DateTime<Utc>>,
    },
}

/// Where a deleted task sat, by its neighbours' ids and by index.
#[derive(Debug, Clone)]
pub struct FormerSlot {
    pub index: usize,
    pub preceding: Option<TaskId>,
    pub following: Option<TaskId>,
}

/// Outcome of a background store call.
#[derive(Debug)]
pub enum Completion {
    Created {
        local_id: TaskId,
        result: StoreResult<TaskRecord>,
    },
    Updated {
        id: TaskId,
        seq: u64,
        result: StoreResult<TaskRecord>,
    },
    Deleted {
        task: Task,
        slot: FormerSlot,
        result: StoreResult<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateState {
    InFlight,
    Stored,
    Failed,
}

/// An update that may still have to be undone.
#[derive(Debug)]
struct PendingUpdate {
    seq: u64,
    undo: UpdateUndo,
    state: UpdateState,
}

/// An edit in progress on an existing task.
#[derive(Debug, Clone)]
pub struct EditSession {
    id: TaskId,
    pub form: TaskForm,
}

impl EditSession {
    pub fn id(&self) -> &TaskId {
        &self.id
    }
}

pub struct TaskListController {
    store: Arc<dyn TaskStore>,
    policy: ConsistencyPolicy,
    tasks: Vec<Task>,
    next_id: u64,
    create_form: TaskForm,
    edit: Option<EditSession>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    next_seq: u64,
    /// Per task, updates not yet settled, oldest first. Only kept when the
    /// policy rolls back.
    pending_updates: HashMap<TaskId, Vec<PendingUpdate>>,
}

impl TaskListController {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            store,
            policy: ConsistencyPolicy::default(),
            tasks: Vec::new(),
            next_id: 1,
            create_form: TaskForm::default(),
            edit: None,
            completions_tx,
            completions_rx,
            in_flight: 0,
            next_seq: 0,
            pending_updates: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: ConsistencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    /// Tasks, most recently created first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn position_of(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == Some(id))
    }

    /// Id the next locally created task will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Store calls issued but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn create_form(&self) -> &TaskForm {
        &self.create_form
    }

    pub fn create_form_mut(&mut self) -> &mut TaskForm {
        &mut self.create_form
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn edit_form_mut(&mut self) -> Option<&mut TaskForm> {
        self.edit.as_mut().map(|session| &mut session.form)
    }

    /// Replace the list with whatever the store holds.
    ///
    /// On failure the list is left untouched and the error is logged and
    /// returned; nothing is retried.
    pub async fn load(&mut self) -> ControllerResult<usize> {
        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load tasks");
                return Err(e.into());
            }
        };

        self.tasks = records.into_iter().map(Task::from_record).collect();
        // The store's view replaces every unconfirmed local change.
        self.pending_updates.clear();

        let max_numeric = self
            .tasks
            .iter()
            .filter_map(|t| t.id().and_then(TaskId::as_numeric))
            .max();
        if let Some(max) = max_numeric {
            self.next_id = max + 1;
        }

        info!(
            count = self.tasks.len(),
            next_id = self.next_id,
            "Loaded tasks"
        );
        Ok(self.tasks.len())
    }

    /// Validate the creation form and, if it passes, prepend a new task.
    ///
    /// The task stays in the list whatever the store answers, unless the
    /// policy rolls back failures.
    pub fn submit_create(&mut self) -> ControllerResult<TaskId> {
        let details = self.create_form.validate().map_err(|errors| {
            debug!(%errors, "Create form rejected");
            ControllerError::Invalid(errors)
        })?;

        let id = TaskId::from(self.next_id);
        self.next_id += 1;

        let task = Task::new(id.clone(), details, Utc::now());
        let record = task.to_record();
        self.tasks.insert(0, task);
        self.create_form.reset();
        info!(id = %id, title = %record.title, "Created task locally");

        let store = Arc::clone(&self.store);
        let local_id = id.clone();
        self.spawn(async move {
            let result = store.create(record).await;
            Completion::Created { local_id, result }
        });

        Ok(id)
    }

    /// Flip a task between pending and done and push the full record.
    ///
    /// A task without an id is flipped locally only.
    pub fn toggle(&mut self, index: usize) -> ControllerResult<TaskStatus> {
        let task = self
            .tasks
            .get_mut(index)
            .ok_or(ControllerError::NoSuchTask(index))?;

        let previous = task.status();
        let status = task.toggle();
        debug!(id = ?task.id(), ?previous, ?status, "Toggled task");

        let Some(id) = task.id().cloned() else {
            warn!(index, "Task has no id, skipping remote update");
            return Ok(status);
        };
        let record = task.to_record();

        let seq = self.track_update(&id, UpdateUndo::Status(previous));
        let store = Arc::clone(&self.store);
        self.spawn(async move {
            let result = store.update(record).await;
            Completion::Updated { id, seq, result }
        });

        Ok(status)
    }

    /// Remove a task locally and ask the store to delete it.
    ///
    /// Refuses tasks without an id before touching anything.
    pub fn delete(&mut self, index: usize) -> ControllerResult<TaskId> {
        let task = self
            .tasks
            .get(index)
            .ok_or(ControllerError::NoSuchTask(index))?;

        let Some(id) = task.id().cloned() else {
            warn!(index, "Refusing to delete a task without id");
            return Err(ControllerError::MissingId);
        };

        let position = self
            .position_of(&id)
            .ok_or_else(|| ControllerError::UnknownTask(id.clone()))?;
        let slot = FormerSlot {
            index: position,
            preceding: position
                .checked_sub(1)
                .and_then(|i| self.tasks[i].id().cloned()),
            following: self.tasks.get(position + 1).and_then(|t| t.id().cloned()),
        };
        let removed = self.tasks.remove(position);
        self.pending_updates.remove(&id);

        if self.edit.as_ref().is_some_and(|session| session.id == id) {
            debug!(id = %id, "Dropping edit of deleted task");
            self.edit = None;
        }
        info!(id = %id, "Deleted task locally");

        let store = Arc::clone(&self.store);
        let remote_id = id.clone();
        self.spawn(async move {
            let result = store.delete(&remote_id).await;
            Completion::Deleted {
                task: removed,
                slot,
                result,
            }
        });

        Ok(id)
    }

    /// Start editing the task at `index`. Only persisted tasks can be edited.
    pub fn begin_edit(&mut self, index: usize) -> ControllerResult<&mut TaskForm> {
        let task = self
            .tasks
            .get(index)
            .ok_or(ControllerError::NoSuchTask(index))?;

        let Some(id) = task.id().cloned() else {
            warn!(index, "Refusing to edit a task without id");
            return Err(ControllerError::MissingId);
        };

        let session = self.edit.insert(EditSession {
            id,
            form: TaskForm::from_task(task),
        });
        Ok(&mut session.form)
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Validate the edit form with the creation rules and apply it.
    ///
    /// An invalid form keeps the edit open so the user can fix it.
    pub fn submit_edit(&mut self) -> ControllerResult<TaskId> {
        let session = self.edit.as_ref().ok_or(ControllerError::NotEditing)?;
        let details = session
            .form
            .validate()
            .map_err(ControllerError::Invalid)?;
        let id = session.id.clone();
        self.edit = None;

        let position = self
            .position_of(&id)
            .ok_or_else(|| ControllerError::UnknownTask(id.clone()))?;
        let task = &mut self.tasks[position];
        let (previous, previous_updated_at) = task.apply_details(details, Some(Utc::now()));
        let record = task.to_record();
        info!(id = %id, "Edited task locally");

        let seq = self.track_update(
            &id,
            UpdateUndo::Details {
                details: previous,
                updated_at: previous_updated_at,
            },
        );
        let store = Arc::clone(&self.store);
        let remote_id = id.clone();
        self.spawn(async move {
            let result = store.update(record).await;
            Completion::Updated {
                id: remote_id,
                seq,
                result,
            }
        });

        Ok(id)
    }

    /// Wait for the next store call to finish.
    ///
    /// Pends forever while nothing is in flight, which makes it suitable as
    /// a `tokio::select!` branch.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Apply every completion that has already arrived, without waiting.
    pub fn try_apply_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply every outstanding store call.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.completions_rx.recv().await {
                Some(completion) => self.apply_completion(completion),
                None => break,
            }
        }
    }

    pub fn apply_completion(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Created {
                local_id,
                result: Ok(record),
            } => self.adopt_remote_id(local_id, record.id),
            Completion::Created {
                local_id,
                result: Err(e),
            } => {
                error!(id = %local_id, error = %e, "Remote create failed");
                if self.policy.rolls_back() {
                    if let Some(position) = self.position_of(&local_id) {
                        self.tasks.remove(position);
                        info!(id = %local_id, "Rolled back create");
                    }
                }
            }
            Completion::Updated { id, seq, result } => {
                let state = match result {
                    Ok(_) => {
                        debug!(id = %id, "Remote update succeeded");
                        UpdateState::Stored
                    }
                    Err(e) => {
                        error!(id = %id, error = %e, "Remote update failed");
                        UpdateState::Failed
                    }
                };
                if self.policy.rolls_back() {
                    self.resolve_update(seq, state);
                }
            }
            Completion::Deleted {
                task, result: Ok(()), ..
            } => debug!(id = ?task.id(), "Remote delete succeeded"),
            Completion::Deleted {
                task,
                slot,
                result: Err(e),
            } => {
                error!(id = ?task.id(), error = %e, "Remote delete failed");
                if self.policy.rolls_back() {
                    self.restore_deleted(task, slot);
                }
            }
        }
    }

    fn adopt_remote_id(&mut self, local_id: TaskId, remote_id: Option<TaskId>) {
        let Some(remote_id) = remote_id else {
            debug!(id = %local_id, "Store returned no id, keeping local id");
            return;
        };
        if remote_id == local_id {
            return;
        }

        if let Some(n) = remote_id.as_numeric() {
            self.next_id = self.next_id.max(n + 1);
        }
        if let Some(pending) = self.pending_updates.remove(&local_id) {
            self.pending_updates.insert(remote_id.clone(), pending);
        }

        let Some(position) = self.position_of(&local_id) else {
            debug!(id = %local_id, "Created task is gone, ignoring store id");
            return;
        };
        self.tasks[position].set_id(remote_id.clone());
        if let Some(session) = self.edit.as_mut().filter(|s| s.id == local_id) {
            session.id = remote_id.clone();
        }
        info!(local_id = %local_id, id = %remote_id, "Adopted store id");
    }

    fn track_update(&mut self, id: &TaskId, undo: UpdateUndo) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.policy.rolls_back() {
            self.pending_updates
                .entry(id.clone())
                .or_default()
                .push(PendingUpdate {
                    seq,
                    undo,
                    state: UpdateState::InFlight,
                });
        }
        seq
    }

    /// Record the outcome of update `seq` and unwind what can be unwound.
    ///
    /// Undo entries are applied newest first, and only once every newer
    /// update of the same task has settled. A stored update carries the
    /// full record, so it supersedes every older entry.
    fn resolve_update(&mut self, seq: u64, state: UpdateState) {
        let Some(id) = self
            .pending_updates
            .iter()
            .find(|(_, pending)| pending.iter().any(|p| p.seq == seq))
            .map(|(id, _)| id.clone())
        else {
            debug!(seq, "Update no longer tracked, nothing to roll back");
            return;
        };

        let mut undos = Vec::new();
        if let Some(pending) = self.pending_updates.get_mut(&id) {
            if let Some(entry) = pending.iter_mut().find(|p| p.seq == seq) {
                entry.state = state;
            }
            while let Some(newest) = pending.last() {
                match newest.state {
                    UpdateState::InFlight => break,
                    UpdateState::Stored => pending.clear(),
                    UpdateState::Failed => {
                        if let Some(failed) = pending.pop() {
                            undos.push(failed.undo);
                        }
                    }
                }
            }
            if pending.is_empty() {
                self.pending_updates.remove(&id);
            }
        }

        for undo in undos {
            self.undo_update(&id, undo);
        }
    }

    fn restore_deleted(&mut self, task: Task, slot: FormerSlot) {
        let Some(id) = task.id().cloned() else {
            return;
        };
        if self.position_of(&id).is_some() {
            debug!(id = %id, "Deleted task is back in the list, not restoring");
            return;
        }

        let index = slot
            .following
            .as_ref()
            .and_then(|next| self.position_of(next))
            .or_else(|| {
                slot.preceding
                    .as_ref()
                    .and_then(|prev| self.position_of(prev))
                    .map(|i| i + 1)
            })
            .unwrap_or(slot.index)
            .min(self.tasks.len());

        info!(id = %id, index, "Rolled back delete");
        self.tasks.insert(index, task);
    }

    fn undo_update(&mut self, id: &TaskId, undo: UpdateUndo) {
        let Some(position) = self.position_of(id) else {
            debug!(id = %id, "Updated task is gone, nothing to roll back");
            return;
        };
        let task = &mut self.tasks[position];
        match undo {
            UpdateUndo::Status(status) => task.set_status(status),
            UpdateUndo::Details {
                details,
                updated_at,
            } => {
                task.apply_details(details, updated_at);
            }
        }
        info!(id = %id, "Rolled back update");
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            if completions.send(call.await).is_err() {
                debug!("Controller dropped before store call finished");
            }
        });
    }
}
