use std::sync::Arc;
use std::time::Duration;

use orka_mux::fake::FakeMultiplexer;

use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::store::{AppStore, ForkStatus};

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        assistant_bin: "assistant".to_owned(),
        bridge_bin: "orka-bridge-does-not-exist".to_owned(),
        bridge_base_port: 18500,
        host: "127.0.0.1".to_owned(),
        auto_merge_wait: Duration::from_millis(10),
        capture_lines: 200,
        shell_settle: Duration::from_millis(1),
    }
}

async fn test_orchestrator() -> (Orchestrator, tempfile::TempDir) {
    let home = tempfile::tempdir().unwrap();
    let agents = tempfile::tempdir().unwrap();
    let store = Arc::new(AppStore::new(home.path(), agents.path()));
    let mux = Arc::new(FakeMultiplexer::new());
    let orchestrator = Orchestrator::new(store, mux, test_config());
    let project = tempfile::tempdir().unwrap();
    (orchestrator, project)
}

#[tokio::test]
async fn create_fork_off_main_persists_active_with_pane() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();

    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    assert_eq!(fork.name, "planets");
    assert_eq!(fork.parent_id, "main");
    assert_eq!(fork.status, ForkStatus::Active);
    assert!(fork.pane_id.is_some());
    assert_ne!(fork.assistant_session_id, session.main.assistant_session_id);
}

#[tokio::test]
async fn second_active_fork_under_same_parent_is_refused() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();

    orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let store = orchestrator.project_store(project.path()).await;
    let before = store.snapshot().await;

    let err = orchestrator
        .create_fork(project.path(), &session.id, None, Some("moons".into()), true)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::OrkaError::Precondition(_)));

    // State must be byte-for-byte identical (scenario S3).
    let after = store.snapshot().await;
    assert_eq!(
        serde_json::to_string(&before).unwrap(),
        serde_json::to_string(&after).unwrap()
    );
}

#[tokio::test]
async fn closing_active_fork_allows_a_new_one_under_the_same_parent() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    orchestrator.close_fork(project.path(), &session.id, &fork.id).await.unwrap();

    let second = orchestrator
        .create_fork(project.path(), &session.id, None, Some("moons".into()), true)
        .await
        .unwrap();
    assert_eq!(second.status, ForkStatus::Active);
}

#[tokio::test]
async fn close_fork_clears_pane_and_marks_closed() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let closed = orchestrator.close_fork(project.path(), &session.id, &fork.id).await.unwrap();
    assert_eq!(closed.status, ForkStatus::Closed);
    assert!(closed.pane_id.is_none());
}

#[tokio::test]
async fn delete_fork_removes_the_row() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    orchestrator.delete_fork(project.path(), &session.id, &fork.id).await.unwrap();

    let store = orchestrator.project_store(project.path()).await;
    let reloaded = store.get_session(&session.id).await.unwrap();
    assert!(reloaded.find_fork(&fork.id).is_none());
}

#[tokio::test]
async fn fork_of_inactive_session_is_refused() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    orchestrator.close_session(project.path(), &session.id).await.unwrap();

    let err = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::OrkaError::Precondition(_)));
}

#[tokio::test]
async fn nested_fork_off_another_fork() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let parent = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let child = orchestrator
        .create_fork(project.path(), &session.id, Some(parent.id.clone()), Some("moons".into()), false)
        .await
        .unwrap();

    assert_eq!(child.parent_id, parent.id);
}
