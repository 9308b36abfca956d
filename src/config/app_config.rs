//! # 应用配置结构定义

use crate::management::ManagementConfig;
use crate::setting::runtime::BuiltinEndpoint;
use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库配置
    pub database: super::DatabaseConfig,
    /// 管理端服务器配置
    pub management: ManagementConfig,
    /// 审查调用配置
    pub moderation: ModerationConfig,
    /// 管理端客户端（moderation-ctl）配置
    pub console: ConsoleConfig,
}

/// 审查调用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// 调用审查接口的超时时间（秒）
    pub timeout_seconds: u64,
    /// 内置审查服务的接入信息
    pub builtin: BuiltinEndpoint,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 3,
            builtin: BuiltinEndpoint::default(),
        }
    }
}

/// 管理端客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// 网关管理端地址
    pub base_url: String,
    /// 管理令牌
    pub admin_token: Option<String>,
    /// 单个请求超时时间（秒）
    pub request_timeout: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9090".to_string(),
            admin_token: None,
            request_timeout: 10,
        }
    }
}

impl AppConfig {
    /// 获取管理端口
    #[must_use]
    pub const fn get_management_port(&self) -> u16 {
        self.management.port
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.management.port == 0 {
            return Err("Management port must be greater than 0".to_string());
        }
        if !self.management.api_prefix.starts_with('/') {
            return Err(format!(
                "Management api_prefix must start with '/': {}",
                self.management.api_prefix
            ));
        }
        if self.moderation.timeout_seconds == 0 {
            return Err("moderation.timeout_seconds must be greater than 0".to_string());
        }
        if self.console.request_timeout == 0 {
            return Err("console.request_timeout must be greater than 0".to_string());
        }
        url::Url::parse(&self.moderation.builtin.api_url)
            .map_err(|e| format!("moderation.builtin.api_url is not a valid URL: {e}"))?;
        url::Url::parse(&self.console.base_url)
            .map_err(|e| format!("console.base_url is not a valid URL: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(AppConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [management]
            port = 9191
            admin_token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.get_management_port(), 9191);
        assert_eq!(config.management.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.moderation.timeout_seconds, 3);
        assert_eq!(config.management.api_prefix, "/api");
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.moderation.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_console_timeout() {
        let mut config = AppConfig::default();
        config.console.request_timeout = 0;
        assert_eq!(
            config.validate(),
            Err("console.request_timeout must be greater than 0".to_string())
        );
    }
}
