use std::sync::Arc;
use std::time::Duration;

use orka_mux::fake::FakeMultiplexer;

use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::store::{AppStore, ForkStatus};

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        assistant_bin: "assistant".to_owned(),
        bridge_bin: "orka-bridge-does-not-exist".to_owned(),
        bridge_base_port: 18700,
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
async fn reattach_keeps_fork_ids_stable_when_pane_still_present() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let resumed = orchestrator.resume_session(project.path(), &session.id).await.unwrap();
    let resumed_fork = resumed.find_fork(&fork.id).unwrap();
    assert_eq!(resumed_fork.assistant_session_id, fork.assistant_session_id);
    assert_eq!(resumed_fork.pane_id, fork.pane_id);
    assert_eq!(resumed_fork.status, ForkStatus::Active);
}

#[tokio::test]
async fn full_recovery_relaunches_forks_with_same_assistant_ids() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();
    let original_fork_assistant_id = fork.assistant_session_id.clone();
    let original_main_assistant_id = session.main.assistant_session_id.clone();

    // Simulate a host restart: the whole multiplexer session is gone.
    orchestrator.mux.kill_session(&session.mux_session_name).await.unwrap();

    let recovered = orchestrator.resume_session(project.path(), &session.id).await.unwrap();
    assert_eq!(recovered.main.assistant_session_id, original_main_assistant_id);
    assert!(recovered.main.pane_id.is_some());

    let recovered_fork = recovered.find_fork(&fork.id).unwrap();
    assert_eq!(recovered_fork.assistant_session_id, original_fork_assistant_id);
    assert_eq!(recovered_fork.status, ForkStatus::Active);
    assert!(recovered_fork.pane_id.is_some());
    // A fresh pane must have been allocated — not the stale id from before.
    assert_ne!(recovered_fork.pane_id, fork.pane_id);
}

#[tokio::test]
async fn closed_and_merged_forks_are_left_untouched_on_recovery() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let closed_fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("closed-one".into()), true)
        .await
        .unwrap();
    orchestrator.close_fork(project.path(), &session.id, &closed_fork.id).await.unwrap();

    orchestrator.mux.kill_session(&session.mux_session_name).await.unwrap();
    let recovered = orchestrator.resume_session(project.path(), &session.id).await.unwrap();

    let recovered_fork = recovered.find_fork(&closed_fork.id).unwrap();
    assert_eq!(recovered_fork.status, ForkStatus::Closed);
    assert!(recovered_fork.pane_id.is_none());
}

#[tokio::test]
async fn startup_recovery_pass_probes_without_downgrading_status() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    orchestrator.mux.kill_session(&session.mux_session_name).await.unwrap();

    crate::orchestrator::recovery::startup_recovery_pass(
        &orchestrator.store,
        &*orchestrator.mux,
        &[project.path().to_owned()],
    )
    .await;

    let store = orchestrator.project_store(project.path()).await;
    let reloaded = store.get_session(&session.id).await.unwrap();
    // Status is left `active` (pane-less) rather than silently downgraded.
    assert_eq!(reloaded.status, crate::store::SessionStatus::Active);
}
