//! 配置文件加载集成测试

use std::io::Write;

use moderation_gateway::config::ConfigManager;

const CONFIG: &str = r#"
[database]
url = "sqlite::memory:"

[management]
port = 9191
admin_token = "from-file"

[moderation]
timeout_seconds = 5

[moderation.builtin]
api_url = "https://moderation.internal/v1/moderations"

[console]
base_url = "http://127.0.0.1:9191"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[tokio::test]
async fn file_values_and_defaults_are_merged() {
    let file = write_config(CONFIG);
    let manager = ConfigManager::from_file(file.path()).await.expect("load config");
    let config = manager.get_config().await;

    assert_eq!(config.management.port, 9191);
    assert_eq!(config.management.admin_token.as_deref(), Some("from-file"));
    assert_eq!(config.moderation.timeout_seconds, 5);
    assert_eq!(
        config.moderation.builtin.api_url,
        "https://moderation.internal/v1/moderations"
    );
    // 未写的字段取默认值
    assert_eq!(config.moderation.builtin.model, "text-moderation-latest");
    assert_eq!(config.console.request_timeout, 10);
    assert_eq!(config.management.api_prefix, "/api");
}

#[tokio::test]
async fn reload_picks_up_changes() {
    let file = write_config(CONFIG);
    let manager = ConfigManager::from_file(file.path()).await.expect("load config");

    let updated = CONFIG.replace("port = 9191", "port = 9393");
    std::fs::write(file.path(), updated).expect("rewrite config");

    manager.reload().await.expect("reload");
    assert_eq!(manager.get_config().await.management.port, 9393);
}

#[tokio::test]
async fn malformed_file_is_rejected() {
    let file = write_config("[database\nurl = ");
    assert!(ConfigManager::from_file(file.path()).await.is_err());
}
