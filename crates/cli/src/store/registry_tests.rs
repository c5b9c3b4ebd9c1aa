use super::*;

#[tokio::test]
async fn register_is_idempotent_on_path() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ProjectRegistry::load(dir.path());
    let a = reg.register("/tmp/demo", "demo").await.unwrap();
    let b = reg.register("/tmp/demo", "demo-renamed").await.unwrap();
    assert_eq!(a.added_at, b.added_at);
    assert_eq!(reg.list().await.len(), 1);
}

#[tokio::test]
async fn deregister_leaves_files_untouched_and_reports_existence() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ProjectRegistry::load(dir.path());
    reg.register("/tmp/demo", "demo").await.unwrap();
    assert!(reg.deregister("/tmp/demo").await.unwrap());
    assert!(!reg.deregister("/tmp/demo").await.unwrap());
    assert!(reg.list().await.is_empty());
}

#[tokio::test]
async fn registry_persists_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    {
        let reg = ProjectRegistry::load(dir.path());
        reg.register("/tmp/demo", "demo").await.unwrap();
    }
    let reloaded = ProjectRegistry::load(dir.path());
    assert_eq!(reloaded.list().await.len(), 1);
}

#[tokio::test]
async fn agent_registry_upsert_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let reg = AgentRegistry::load(dir.path());
    let agent = AgentConfig {
        id: "a1".to_owned(),
        project_path: "/tmp/demo".to_owned(),
        session_id: "s1".to_owned(),
        chat_credentials: None,
        enabled_hooks: EnabledHooks::default(),
        approval_policy: ApprovalPolicy::default(),
        watchdog_interval_secs: 30,
        running: false,
    };
    reg.upsert(agent.clone()).await.unwrap();
    assert!(reg.get("a1").await.is_some());

    reg.set_running("a1", true).await.unwrap();
    assert!(reg.get("a1").await.unwrap().running);

    assert!(reg.remove("a1").await.unwrap());
    assert!(reg.get("a1").await.is_none());
}

#[test]
fn approval_policy_resolves_tool_decision() {
    let policy = ApprovalPolicy {
        auto_approve_tools: vec!["edit".to_owned(), "write".to_owned()],
        auto_deny_tools: vec!["bash".to_owned()],
    };
    assert_eq!(policy.decision_for_tool("edit"), Some(true));
    assert_eq!(policy.decision_for_tool("bash"), Some(false));
    assert_eq!(policy.decision_for_tool("unknown"), None);
}

#[test]
fn enabled_hooks_default_is_all_on() {
    let hooks = EnabledHooks::default();
    assert!(hooks.is_enabled(crate::event::HookEventKind::SessionStart));
    assert!(hooks.is_enabled(crate::event::HookEventKind::Permission));
}
