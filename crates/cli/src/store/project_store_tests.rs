use super::*;
use crate::store::model::{BranchStatus, ForkStatus, SessionStatus};

fn new_session(id: &str) -> Session {
    Session {
        id: id.to_owned(),
        name: "alpha".to_owned(),
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        last_activity_at: "2026-01-01T00:00:00Z".to_owned(),
        status: SessionStatus::Active,
        mux_session_name: format!("orka-{id}"),
        bridge: None,
        main: Branch {
            assistant_session_id: "asst-main".to_owned(),
            pane_id: Some("%0".to_owned()),
            status: BranchStatus::Active,
        },
        forks: Vec::new(),
    }
}

fn new_fork(id: &str) -> Fork {
    Fork {
        id: id.to_owned(),
        name: id.to_owned(),
        parent_id: "main".to_owned(),
        assistant_session_id: format!("asst-{id}"),
        pane_id: Some("%1".to_owned()),
        status: ForkStatus::Active,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        context_path: None,
        merged_at: None,
    }
}

#[tokio::test]
async fn fresh_project_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    let snap = store.snapshot().await;
    assert!(snap.sessions.is_empty());
    assert_eq!(snap.version, CURRENT_SCHEMA_VERSION);
    assert!(ProjectStore::orka_dir(dir.path()).join("theme.conf").exists());
}

#[tokio::test]
async fn add_session_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    store.add_session(new_session("s1")).await.unwrap();

    let reloaded = ProjectStore::load(dir.path());
    let snap = reloaded.snapshot().await;
    assert_eq!(snap.sessions.len(), 1);
    assert_eq!(snap.sessions[0].id, "s1");
}

#[tokio::test]
async fn corrupted_state_quarantined_and_fresh_store_usable() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = ProjectStore::state_path(dir.path());
    std::fs::create_dir_all(state_path.parent().unwrap()).unwrap();
    std::fs::write(&state_path, "{ this is not json").unwrap();

    let store = ProjectStore::load(dir.path());
    let snap = store.snapshot().await;
    assert!(snap.sessions.is_empty());

    // the corrupted original is quarantined, not deleted
    let entries: Vec<_> = std::fs::read_dir(state_path.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.iter().any(|n| n.starts_with("state.json.corrupt-")));
}

#[tokio::test]
async fn fork_lifecycle_add_update_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    store.add_session(new_session("s1")).await.unwrap();
    store.add_fork("s1", new_fork("f1")).await.unwrap();

    let fork = store.get_fork("s1", "f1").await.unwrap();
    assert_eq!(fork.status, ForkStatus::Active);

    let mut updated = fork.clone();
    updated.status = ForkStatus::Merged;
    updated.context_path = Some("exports/fork-f1-x.md".to_owned());
    updated.merged_at = Some("2026-01-01T01:00:00Z".to_owned());
    updated.pane_id = None;
    let ok = store.update_fork("s1", updated).await.unwrap();
    assert!(ok);

    let merged = store.get_fork("s1", "f1").await.unwrap();
    assert_eq!(merged.status, ForkStatus::Merged);
    assert!(merged.pane_id.is_none());

    let deleted = store.delete_fork("s1", "f1").await.unwrap();
    assert!(deleted);
    assert!(store.get_fork("s1", "f1").await.is_none());
}

#[tokio::test]
async fn delete_session_reports_whether_row_existed() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    store.add_session(new_session("s1")).await.unwrap();

    assert!(store.delete_session("s1").await.unwrap());
    assert!(!store.delete_session("s1").await.unwrap());
}

#[tokio::test]
async fn with_write_broadcasts_delta() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    let mut rx = store.subscribe();
    store.add_session(new_session("s1")).await.unwrap();

    let delta = rx.try_recv().expect("expected a broadcast delta");
    assert_eq!(delta.session_id.as_deref(), Some("s1"));
    assert_eq!(delta.kind, "session_added");
}

#[tokio::test]
async fn schema_version_mismatch_triggers_reinit_without_losing_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProjectStore::load(dir.path());
    store.add_session(new_session("s1")).await.unwrap();

    // Simulate an old schema by rewriting version on disk directly.
    let path = ProjectStore::state_path(dir.path());
    let mut project: Project = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    project.version = 0;
    std::fs::write(&path, serde_json::to_string(&project).unwrap()).unwrap();
    std::fs::remove_file(ProjectStore::orka_dir(dir.path()).join("theme.conf")).unwrap();

    let reloaded = ProjectStore::load(dir.path());
    let snap = reloaded.snapshot().await;
    assert_eq!(snap.version, CURRENT_SCHEMA_VERSION);
    assert_eq!(snap.sessions.len(), 1, "reinit must not discard session rows");
    assert!(ProjectStore::orka_dir(dir.path()).join("theme.conf").exists());
}
