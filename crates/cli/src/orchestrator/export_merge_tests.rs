use std::sync::Arc;
use std::time::Duration;

use orka_mux::fake::FakeMultiplexer;

use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::store::{AppStore, ForkStatus};

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        assistant_bin: "assistant".to_owned(),
        bridge_bin: "orka-bridge-does-not-exist".to_owned(),
        bridge_base_port: 18600,
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

/// Simulate the assistant in the fork's pane actually writing the export
/// file the prompt asked for.
fn write_export(project_root: &std::path::Path, relative_path: &str, body: &str) {
    let path = project_root.join(relative_path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn export_then_merge_happy_path() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let relative = orchestrator.export_fork(project.path(), &session.id, &fork.id).await.unwrap();
    write_export(project.path(), &relative, "# Executive Summary\n...\n");

    let merged = orchestrator.merge_fork(project.path(), &session.id, &fork.id).await.unwrap();
    assert_eq!(merged.status, ForkStatus::Merged);
    assert!(merged.merged_at.is_some());
    assert!(merged.pane_id.is_none());
}

#[tokio::test]
async fn merge_without_export_is_refused_and_state_unchanged() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let store = orchestrator.project_store(project.path()).await;
    let before = store.snapshot().await;

    let err = orchestrator.merge_fork(project.path(), &session.id, &fork.id).await.unwrap_err();
    assert!(matches!(err, crate::error::OrkaError::Precondition(_)));

    let after = store.snapshot().await;
    assert_eq!(
        serde_json::to_string(&before).unwrap(),
        serde_json::to_string(&after).unwrap()
    );
}

#[tokio::test]
async fn merge_tolerates_export_path_drift() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    let relative = orchestrator.export_fork(project.path(), &session.id, &fork.id).await.unwrap();

    // The assistant wrote a file with a slightly different timestamp suffix
    // instead of the exact recorded path (property 6).
    let drifted_relative = ".orka/exports/fork-planets-DRIFTED.md";
    write_export(project.path(), drifted_relative, "# Executive Summary\n...\n");
    // Recorded path itself never gets created.
    let recorded_absolute = project.path().join(&relative);
    assert!(!recorded_absolute.exists());

    let merged = orchestrator.merge_fork(project.path(), &session.id, &fork.id).await.unwrap();
    assert_eq!(merged.status, ForkStatus::Merged);
    assert_eq!(merged.context_path.as_deref(), Some(drifted_relative));
}

#[tokio::test]
async fn auto_merge_exports_waits_then_merges() {
    let (orchestrator, project) = test_orchestrator().await;
    let session = orchestrator.create_session(project.path(), None, None).await.unwrap();
    let fork = orchestrator
        .create_fork(project.path(), &session.id, None, Some("planets".into()), true)
        .await
        .unwrap();

    // Race the write against the orchestrator's sleep — the auto-merge wait
    // in tests is 10ms, plenty of time for this synchronous write.
    let project_root = project.path().to_owned();
    let fork_name = fork.name.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        let filename = format!("fork-{fork_name}-placeholder.md");
        write_export(&project_root, &format!(".orka/exports/{filename}"), "# Executive Summary\n");
    });

    let merged = orchestrator.auto_merge_fork(project.path(), &session.id, &fork.id).await.unwrap();
    assert_eq!(merged.status, ForkStatus::Merged);
}
