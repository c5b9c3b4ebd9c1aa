use super::*;

fn base_config() -> Config {
    Config {
        port: 4317,
        hook_port: 4318,
        host: "127.0.0.1".to_owned(),
        auth_token: None,
        mux_bin: "tmux".to_owned(),
        bridge_base_port: 4400,
        llm_endpoint: None,
        llm_timeout_secs: 20,
        chat_webhook: None,
        watchdog_interval_secs: 30,
        watchdog_k: 2,
        watchdog_m: 2,
        auto_merge_wait_secs: 15,
        capture_lines: 200,
        log_format: "json".to_owned(),
        log_level: "info".to_owned(),
        orka_home: None,
    }
}

#[test]
fn rejects_matching_ports() {
    let mut config = base_config();
    config.hook_port = config.port;
    assert!(config.validate().is_err());
}

#[test]
fn rejects_bad_log_format() {
    let mut config = base_config();
    config.log_format = "xml".to_owned();
    assert!(config.validate().is_err());
}

#[test]
fn accepts_defaults() {
    assert!(base_config().validate().is_ok());
}

#[test]
fn agents_dir_is_sibling_of_home_override() {
    let mut config = base_config();
    config.orka_home = Some(PathBuf::from("/tmp/orka-test/.orka"));
    assert_eq!(config.agents_dir(), PathBuf::from("/tmp/orka-test/.orka-agents"));
}
