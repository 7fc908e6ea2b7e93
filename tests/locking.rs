mod support;

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use support::TestStore;
use todo_orchestrator::config::Config;
use todo_orchestrator::lock::{LockOwner, StoreLock, LOCK_FILE};
use todo_orchestrator::object::ObjectStore;
use todo_orchestrator::refs::RefStore;
use todo_orchestrator::{Error, Orchestrator, TaskUpdate};
use uuid::Uuid;

/// Orchestrator with a short lock timeout, via the config file path.
fn impatient_orchestrator(store: &TestStore) -> Orchestrator {
    fs::write(
        store.path().join(".todo.toml"),
        "[lock]\ntimeout_ms = 100\n",
    )
    .unwrap();
    let config = Config::load(store.path()).unwrap();
    Orchestrator::open_with_config(store.path(), &config).unwrap()
}

#[test]
fn held_lock_blocks_mutations() {
    let store = TestStore::new();
    let orch = impatient_orchestrator(&store);
    orch.create_task("before", None).unwrap();

    let lock = StoreLock::acquire(store.store_path().join(LOCK_FILE), 1000).unwrap();

    let result = orch.create_task("blocked", None);
    assert!(matches!(result, Err(Error::LockContention(_))));

    // Reads are lock-free.
    assert_eq!(orch.list_tasks(true).unwrap().len(), 1);

    drop(lock);
    orch.create_task("after", None).unwrap();
    assert_eq!(orch.list_tasks(true).unwrap().len(), 2);
}

#[test]
fn overlapping_writers_serialize() {
    let store = TestStore::new();
    let orch = store.orchestrator();
    let task_id = orch.create_task("contended", None).unwrap().task_id;

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let store_path = store.store_path();

    let mut handles = Vec::with_capacity(threads);
    for idx in 0..threads {
        let barrier = Arc::clone(&barrier);
        let store_path = store_path.clone();
        handles.push(thread::spawn(move || {
            let orch = Orchestrator::open(&store_path).unwrap();
            barrier.wait();
            orch.update_task(
                task_id,
                TaskUpdate {
                    status: Some(format!("writer-{idx}")),
                    ..TaskUpdate::default()
                },
            )
            .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Serialized writers build one linear chain: root + one version each.
    let orch = store.orchestrator();
    let history = orch.history(task_id).unwrap();
    assert_eq!(history.len(), threads + 1);
    for pair in history.windows(2) {
        assert_eq!(pair[0].parent.as_deref(), Some(pair[1].hash.as_str()));
    }
}

#[test]
fn stale_lock_is_surfaced_and_recoverable() {
    let store = TestStore::new();
    let orch = impatient_orchestrator(&store);
    let task_id = orch.create_task("survivor", None).unwrap().task_id;

    // A child that already exited leaves us a pid that is not alive.
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();

    let owner = LockOwner {
        pid: dead_pid,
        acquired_at: chrono::Utc::now(),
    };
    fs::write(
        store.store_path().join(LOCK_FILE),
        serde_json::to_string(&owner).unwrap(),
    )
    .unwrap();

    let result = orch.create_task("blocked", None);
    assert!(matches!(result, Err(Error::StaleLock { pid, .. }) if pid == dead_pid));

    // Reads keep working while the stale marker sits there.
    assert_eq!(orch.current(task_id).unwrap().description, "survivor");

    // Explicit recovery, then writing resumes.
    assert!(orch.force_unlock().unwrap());
    orch.create_task("unblocked", None).unwrap();
}

#[test]
fn crash_before_ref_update_is_invisible() {
    let store = TestStore::new();
    let orch = store.orchestrator();

    let task = orch.create_task("crash test", None).unwrap();
    let refs = RefStore::open(&store.store_path()).unwrap();
    let ref_before = refs.get(&task.task_id).unwrap();

    // Simulate a writer that stored its new version object and died before
    // the ref swap: the object exists but nothing points at it.
    let objects = ObjectStore::open(&store.store_path()).unwrap();
    let mut orphan = orch.current(task.task_id).unwrap().next();
    orphan.status = "never committed".to_string();
    let orphan_hash = objects.put(&serde_json::to_vec(&orphan).unwrap()).unwrap();
    assert!(objects.contains(&orphan_hash).unwrap());

    // Visible state is untouched and fully queryable.
    assert_eq!(refs.get(&task.task_id).unwrap(), ref_before);
    assert_eq!(orch.current(task.task_id).unwrap().status, "pending");
    assert_eq!(orch.history(task.task_id).unwrap().len(), 1);
    assert_eq!(orch.dump(true, true).unwrap().len(), 1);

    // The next real mutation chains onto the committed version, not the orphan.
    let updated = orch
        .update_task(
            task.task_id,
            TaskUpdate {
                status: Some("completed".to_string()),
                ..TaskUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.parent.as_deref(), Some(ref_before.as_str()));
}

#[test]
fn lock_marker_is_cleaned_up_after_mutations() {
    let store = TestStore::new();
    let orch = store.orchestrator();

    orch.create_task("tidy", None).unwrap();
    assert!(!store.store_path().join(LOCK_FILE).exists());

    let missing = Uuid::new_v4();
    let _ = orch.update_task(missing, TaskUpdate::default());
    // Failed mutations release the lock too.
    assert!(!store.store_path().join(LOCK_FILE).exists());
}
