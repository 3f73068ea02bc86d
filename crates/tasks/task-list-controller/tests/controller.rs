//! Controller behaviour against a scripted task store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex};
use task_list_controller::{
    ConsistencyPolicy, ControllerError, FormField, TaskForm, TaskListController, TaskStatus,
};
use task_store_client::{StoreError, StoreResult, TaskId, TaskRecord, TaskStore};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    List,
    Create(TaskRecord),
    Update(TaskRecord),
    Delete(TaskId),
}

/// Store double that records every call and can be told to fail.
#[derive(Default)]
struct ScriptedStore {
    listing: Vec<TaskRecord>,
    assign_id: Option<TaskId>,
    failing: AtomicBool,
    fail_updates: AtomicBool,
    /// Fail this many updates, then let the rest through.
    failing_updates_left: AtomicUsize,
    fail_deletes: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedStore {
    fn with_listing(listing: Vec<TaskRecord>) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }

    fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for ScriptedStore {
    async fn list(&self) -> StoreResult<Vec<TaskRecord>> {
        self.record(Call::List)?;
        Ok(self.listing.clone())
    }

    async fn create(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        self.record(Call::Create(record.clone()))?;
        Ok(TaskRecord {
            id: self.assign_id.clone(),
            ..record.without_id()
        })
    }

    async fn update(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        self.record(Call::Update(record.clone()))?;
        let scripted_failure = self
            .failing_updates_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure || self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("updates scripted to fail".to_string()));
        }
        Ok(record)
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<()> {
        self.record(Call::Delete(id.clone()))?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("deletes scripted to fail".to_string()));
        }
        Ok(())
    }
}

fn record(id: Option<u64>, title: &str) -> TaskRecord {
    TaskRecord {
        id: id.map(TaskId::from),
        title: title.to_string(),
        description: "desc".to_string(),
        ..TaskRecord::default()
    }
}

fn titles(controller: &TaskListController) -> Vec<&str> {
    controller.tasks().iter().map(|t| t.title()).collect()
}

fn fill_valid_form(controller: &mut TaskListController) {
    *controller.create_form_mut() =
        TaskForm::new("Buy milk", "At the store", "https://example.com/a.png");
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn loaded(
    store: Arc<ScriptedStore>,
    policy: ConsistencyPolicy,
) -> TaskListController {
    init_tracing();
    let mut controller = TaskListController::new(store).with_policy(policy);
    controller.load().await.expect("scripted listing succeeds");
    controller
}

#[tokio::test]
async fn test_load_fills_defaults_and_seeds_next_id() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = TaskListController::new(store.clone());

    let count = controller.load().await.unwrap();

    assert_eq!(count, 1);
    let task = &controller.tasks()[0];
    assert!(!task.is_completed());
    assert_eq!(task.presentation().glyph, "❌");
    assert_eq!(controller.next_id(), 2);
    assert_eq!(store.calls(), vec![Call::List]);
}

#[tokio::test]
async fn test_load_uses_highest_numeric_id() {
    let store = Arc::new(ScriptedStore::with_listing(vec![
        record(Some(4), "Four"),
        TaskRecord {
            id: Some(TaskId::from("abc")),
            ..record(None, "Text id")
        },
        record(Some(17), "Seventeen"),
        record(None, "No id"),
    ]));
    let controller = loaded(store, ConsistencyPolicy::default()).await;

    assert_eq!(controller.tasks().len(), 4);
    assert_eq!(controller.tasks()[0].title(), "Four");
    assert_eq!(controller.next_id(), 18);
}

#[tokio::test]
async fn test_empty_load_keeps_next_id() {
    let store = Arc::new(ScriptedStore::default());
    let controller = loaded(store, ConsistencyPolicy::default()).await;

    assert!(controller.tasks().is_empty());
    assert_eq!(controller.next_id(), 1);
}

#[tokio::test]
async fn test_failed_load_leaves_list_empty() {
    let store = Arc::new(ScriptedStore::failing());
    let mut controller = TaskListController::new(store.clone());

    let result = controller.load().await;

    assert!(matches!(result, Err(ControllerError::Store(_))));
    assert!(controller.tasks().is_empty());
    assert_eq!(store.calls(), vec![Call::List]);
}

#[tokio::test]
async fn test_create_prepends_and_resets_form() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    fill_valid_form(&mut controller);
    let id = controller.submit_create().unwrap();
    controller.settle().await;

    assert_eq!(id, TaskId::from(2));
    assert_eq!(controller.tasks().len(), 2);
    let created = &controller.tasks()[0];
    assert_eq!(created.title(), "Buy milk");
    assert_eq!(created.status(), TaskStatus::Pending);
    assert_eq!(created.presentation().toggle_label, "Task not done!");
    assert!(controller.create_form().is_empty());

    match &store.calls()[1] {
        Call::Create(sent) => {
            assert_eq!(sent.title, "Buy milk");
            assert_eq!(sent.completed, Some(false));
            assert_eq!(sent.valid.as_deref(), Some("❌"));
        }
        other => panic!("Expected create call, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_survives_remote_failure() {
    let store = Arc::new(ScriptedStore::default());
    let mut controller = loaded(store.clone(), ConsistencyPolicy::OptimisticAlways).await;
    store.set_failing(true);

    fill_valid_form(&mut controller);
    let id = controller.submit_create().unwrap();
    controller.settle().await;

    assert_eq!(controller.tasks().len(), 1);
    assert_eq!(controller.tasks()[0].id(), Some(&id));
    assert_eq!(id, TaskId::from(1));
    assert!(controller.create_form().is_empty());
    assert_eq!(controller.in_flight(), 0);
}

#[tokio::test]
async fn test_invalid_form_makes_no_change_and_no_call() {
    let store = Arc::new(ScriptedStore::default());
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    let invalid_forms = [
        TaskForm::new("ab", "At the store", "https://example.com/a.png"),
        TaskForm::new("Buy milk", "", "https://example.com/a.png"),
        TaskForm::new("Buy milk", "At the store", "not-a-url"),
    ];

    for form in invalid_forms {
        *controller.create_form_mut() = form.clone();
        let result = controller.submit_create();
        assert!(matches!(result, Err(ControllerError::Invalid(_))));
        assert_eq!(controller.create_form(), &form);
    }

    controller.settle().await;
    assert!(controller.tasks().is_empty());
    assert_eq!(controller.next_id(), 1);
    assert_eq!(store.calls(), vec![Call::List]);
}

#[tokio::test]
async fn test_create_adopts_store_id() {
    let store = Arc::new(ScriptedStore {
        assign_id: Some(TaskId::from(40)),
        ..ScriptedStore::default()
    });
    let mut controller = loaded(store, ConsistencyPolicy::default()).await;

    fill_valid_form(&mut controller);
    controller.submit_create().unwrap();
    controller.settle().await;

    assert_eq!(controller.tasks()[0].id(), Some(&TaskId::from(40)));
    assert_eq!(controller.next_id(), 41);
}

#[tokio::test]
async fn test_toggle_round_trip() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    assert_eq!(controller.toggle(0).unwrap(), TaskStatus::Done);
    let task = &controller.tasks()[0];
    assert!(task.is_completed());
    assert_eq!(task.presentation().glyph, "✅");
    assert_eq!(task.presentation().toggle_label, "Task done!");
    assert!(task.presentation().user_has_pressed);

    assert_eq!(controller.toggle(0).unwrap(), TaskStatus::Pending);
    let task = &controller.tasks()[0];
    assert!(!task.is_completed());
    assert_eq!(task.presentation().glyph, "❌");
    assert!(!task.presentation().user_has_pressed);

    controller.settle().await;
    let updates = store
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Update(_)))
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn test_toggle_done_task_sends_full_record() {
    let store = Arc::new(ScriptedStore::with_listing(vec![TaskRecord {
        completed: Some(true),
        image_url: Some("https://example.com/x.png".to_string()),
        ..record(Some(3), "Done already")
    }]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    controller.toggle(0).unwrap();
    controller.settle().await;

    let task = &controller.tasks()[0];
    assert!(!task.is_completed());
    assert_eq!(task.presentation().glyph, "❌");
    assert_eq!(task.presentation().toggle_label, "Task not done!");

    match store.calls().last() {
        Some(Call::Update(sent)) => {
            assert_eq!(sent.id, Some(TaskId::from(3)));
            assert_eq!(sent.title, "Done already");
            assert_eq!(sent.description, "desc");
            assert_eq!(sent.image_url.as_deref(), Some("https://example.com/x.png"));
            assert_eq!(sent.completed, Some(false));
            assert_eq!(sent.task_button_text.as_deref(), Some("Task not done!"));
            assert!(sent.created_at.is_some());
        }
        other => panic!("Expected update call, got {:?}", other),
    }
}

#[tokio::test]
async fn test_toggle_failure_is_only_logged() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::OptimisticAlways).await;
    store.set_failing(true);

    controller.toggle(0).unwrap();
    controller.settle().await;

    assert!(controller.tasks()[0].is_completed());
}

#[tokio::test]
async fn test_toggle_without_id_stays_local() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(None, "Unsaved")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    controller.toggle(0).unwrap();

    assert!(controller.tasks()[0].is_completed());
    assert_eq!(controller.in_flight(), 0);
    assert_eq!(store.calls(), vec![Call::List]);
}

#[tokio::test]
async fn test_delete_without_id_is_refused() {
    let store = Arc::new(ScriptedStore::with_listing(vec![
        record(Some(1), "Saved"),
        record(None, "Unsaved"),
    ]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    let result = controller.delete(1);

    assert!(matches!(result, Err(ControllerError::MissingId)));
    assert_eq!(controller.tasks().len(), 2);
    assert_eq!(store.calls(), vec![Call::List]);
}

#[tokio::test]
async fn test_delete_removes_exactly_one_task() {
    for failing in [false, true] {
        let store = Arc::new(ScriptedStore::with_listing(vec![
            record(Some(1), "One"),
            record(Some(2), "Two"),
            record(Some(3), "Three"),
        ]));
        let mut controller = loaded(store.clone(), ConsistencyPolicy::OptimisticAlways).await;
        store.set_failing(failing);

        let id = controller.delete(1).unwrap();
        controller.settle().await;

        assert_eq!(id, TaskId::from(2));
        let titles: Vec<_> = controller.tasks().iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["One", "Three"]);
        assert_eq!(store.calls().last(), Some(&Call::Delete(TaskId::from(2))));
    }
}

#[tokio::test]
async fn test_out_of_range_index() {
    let store = Arc::new(ScriptedStore::default());
    let mut controller = loaded(store, ConsistencyPolicy::default()).await;

    assert!(matches!(controller.toggle(0), Err(ControllerError::NoSuchTask(0))));
    assert!(matches!(controller.delete(3), Err(ControllerError::NoSuchTask(3))));
}

#[tokio::test]
async fn test_rollback_policy_undoes_failed_calls() {
    let store = Arc::new(ScriptedStore::with_listing(vec![
        record(Some(1), "One"),
        record(Some(2), "Two"),
    ]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.set_failing(true);

    fill_valid_form(&mut controller);
    controller.submit_create().unwrap();
    assert_eq!(controller.tasks().len(), 3);
    controller.settle().await;
    assert_eq!(controller.tasks().len(), 2);

    controller.toggle(0).unwrap();
    assert!(controller.tasks()[0].is_completed());
    controller.settle().await;
    assert!(!controller.tasks()[0].is_completed());

    controller.delete(1).unwrap();
    assert_eq!(controller.tasks().len(), 1);
    controller.settle().await;
    let titles: Vec<_> = controller.tasks().iter().map(|t| t.title()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[tokio::test]
async fn test_edit_applies_validated_fields() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(5), "Old title")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    let form = controller.begin_edit(0).unwrap();
    assert_eq!(form.title, "Old title");
    form.field_mut(FormField::Title).clear();
    form.field_mut(FormField::Title).push_str("New title");
    form.image_url = "https://example.com/new.png".to_string();

    let id = controller.submit_edit().unwrap();
    controller.settle().await;

    assert_eq!(id, TaskId::from(5));
    assert!(controller.edit_session().is_none());
    let task = &controller.tasks()[0];
    assert_eq!(task.title(), "New title");
    assert_eq!(task.image_url(), "https://example.com/new.png");
    assert!(task.updated_at().is_some());
    assert!(matches!(store.calls().last(), Some(Call::Update(r)) if r.title == "New title"));
}

#[tokio::test]
async fn test_invalid_edit_keeps_session_open() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(5), "Old title")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    controller.begin_edit(0).unwrap().title = "No".to_string();
    let result = controller.submit_edit();

    assert!(matches!(result, Err(ControllerError::Invalid(_))));
    assert!(controller.edit_session().is_some());
    assert_eq!(controller.tasks()[0].title(), "Old title");
    assert_eq!(store.calls(), vec![Call::List]);

    controller.cancel_edit();
    assert!(matches!(controller.submit_edit(), Err(ControllerError::NotEditing)));
}

#[tokio::test]
async fn test_edit_rollback_restores_previous_fields() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(5), "Old title")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.set_failing(true);

    let form = controller.begin_edit(0).unwrap();
    form.title = "New title".to_string();
    form.image_url = "https://example.com/new.png".to_string();
    controller.submit_edit().unwrap();
    controller.settle().await;

    assert_eq!(controller.tasks()[0].title(), "Old title");
    assert!(controller.tasks()[0].updated_at().is_none());
}

#[tokio::test]
async fn test_edit_requires_id() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(None, "Unsaved")]));
    let mut controller = loaded(store, ConsistencyPolicy::default()).await;

    assert!(matches!(controller.begin_edit(0), Err(ControllerError::MissingId)));
    assert!(controller.edit_session().is_none());
}

#[tokio::test]
async fn test_deleting_edited_task_drops_edit() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(5), "Edited")]));
    let mut controller = loaded(store, ConsistencyPolicy::default()).await;

    controller.begin_edit(0).unwrap();
    controller.delete(0).unwrap();

    assert!(controller.edit_session().is_none());
    controller.settle().await;
}

#[tokio::test]
async fn test_late_completion_for_removed_task_is_ignored() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.fail_updates.store(true, Ordering::SeqCst);

    controller.toggle(0).unwrap();
    controller.delete(0).unwrap();
    controller.settle().await;

    assert_eq!(controller.in_flight(), 0);
    assert!(controller.tasks().is_empty());
}

#[tokio::test]
async fn test_two_failed_toggles_restore_original_status() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.fail_updates.store(true, Ordering::SeqCst);

    controller.toggle(0).unwrap();
    controller.toggle(0).unwrap();
    assert_eq!(controller.tasks()[0].status(), TaskStatus::Pending);
    controller.settle().await;

    assert_eq!(controller.tasks()[0].status(), TaskStatus::Pending);
    assert_eq!(controller.tasks()[0].presentation().glyph, "❌");
}

#[tokio::test]
async fn test_failed_toggle_then_stored_toggle_keeps_store_state() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(1), "A")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.failing_updates_left.store(1, Ordering::SeqCst);

    controller.toggle(0).unwrap();
    controller.toggle(0).unwrap();
    controller.settle().await;

    // The second update stored the full record with the task pending again.
    assert_eq!(controller.tasks()[0].status(), TaskStatus::Pending);
    let updates = store
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Update(_)))
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn test_two_failed_edits_restore_original_fields() {
    let store = Arc::new(ScriptedStore::with_listing(vec![record(Some(5), "Original")]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.fail_updates.store(true, Ordering::SeqCst);

    for title in ["First edit", "Second edit"] {
        let form = controller.begin_edit(0).unwrap();
        form.title = title.to_string();
        form.image_url = "https://example.com/new.png".to_string();
        controller.submit_edit().unwrap();
    }
    assert_eq!(controller.tasks()[0].title(), "Second edit");
    controller.settle().await;

    let task = &controller.tasks()[0];
    assert_eq!(task.title(), "Original");
    assert!(task.updated_at().is_none());
}

#[tokio::test]
async fn test_two_failed_deletes_restore_original_order() {
    let store = Arc::new(ScriptedStore::with_listing(vec![
        record(Some(1), "A"),
        record(Some(2), "B"),
        record(Some(3), "C"),
    ]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.fail_deletes.store(true, Ordering::SeqCst);

    controller.delete(0).unwrap();
    controller.delete(0).unwrap();
    assert_eq!(titles(&controller), vec!["C"]);
    controller.settle().await;
    assert_eq!(titles(&controller), vec!["A", "B", "C"]);

    controller.delete(2).unwrap();
    controller.delete(1).unwrap();
    controller.settle().await;
    assert_eq!(titles(&controller), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_failed_delete_after_reload_does_not_duplicate() {
    let store = Arc::new(ScriptedStore::with_listing(vec![
        record(Some(1), "A"),
        record(Some(2), "B"),
    ]));
    let mut controller = loaded(store.clone(), ConsistencyPolicy::RollbackOnFailure).await;
    store.fail_deletes.store(true, Ordering::SeqCst);

    controller.delete(0).unwrap();
    controller.load().await.unwrap();
    controller.settle().await;

    let ids: Vec<_> = controller.tasks().iter().map(|t| t.id().cloned()).collect();
    assert_eq!(ids, vec![Some(TaskId::from(1)), Some(TaskId::from(2))]);
}

#[tokio::test]
async fn test_next_completion_drives_a_select_loop() {
    let store = Arc::new(ScriptedStore {
        assign_id: Some(TaskId::from("srv-9")),
        ..ScriptedStore::default()
    });
    let mut controller = loaded(store.clone(), ConsistencyPolicy::default()).await;

    fill_valid_form(&mut controller);
    controller.submit_create().unwrap();

    let mut applied = 0;
    while controller.in_flight() > 0 {
        tokio::select! {
            Some(completion) = controller.next_completion() => {
                controller.apply_completion(completion);
                applied += 1;
            }
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                panic!("store call never completed");
            }
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(controller.tasks()[0].id(), Some(&TaskId::from("srv-9")));
}
