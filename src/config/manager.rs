//! # 配置管理器
//!
//! 统一的配置管理接口，支持手动重载和环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::AppConfig;
use crate::error::{GatewayError, Result};

/// 环境变量覆盖前缀
const ENV_PREFIX: &str = "MODERATION_GATEWAY_";

/// 配置管理器
pub struct ConfigManager {
    /// 配置文件路径（为空表示纯默认配置）
    config_path: Option<PathBuf>,
    /// 当前配置
    config: Arc<RwLock<AppConfig>>,
    /// 环境变量覆盖映射
    env_overrides: HashMap<String, String>,
}

impl ConfigManager {
    /// 创建配置管理器
    ///
    /// 优先使用 `MODERATION_GATEWAY_CONFIG_PATH`，否则读取 `config/config.{RUST_ENV}.toml`；
    /// 文件不存在时使用默认配置。
    pub async fn new() -> Result<Self> {
        let config_file = if let Ok(path) = env::var("MODERATION_GATEWAY_CONFIG_PATH") {
            path
        } else {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        };

        if Path::new(&config_file).exists() {
            Self::from_file(&config_file).await
        } else {
            warn!("配置文件不存在: {}, 使用默认配置", config_file);
            Self::from_config(AppConfig::default(), Self::build_env_overrides(env::vars()))
        }
    }

    /// 从指定文件创建配置管理器
    pub async fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        let mut manager = Self::from_config(config, Self::build_env_overrides(env::vars()))?;
        manager.config_path = Some(config_path.to_path_buf());
        Ok(manager)
    }

    fn from_config(mut config: AppConfig, env_overrides: HashMap<String, String>) -> Result<Self> {
        Self::apply_env_overrides(&mut config, &env_overrides)?;
        config.validate().map_err(GatewayError::config)?;

        info!("配置管理器初始化完成");
        info!("- 环境变量覆盖: {} 个", env_overrides.len());

        Ok(Self {
            config_path: None,
            config: Arc::new(RwLock::new(config)),
            env_overrides,
        })
    }

    /// 获取当前配置
    pub async fn get_config(&self) -> AppConfig {
        (*self.config.read().await).clone()
    }

    /// 手动重载配置
    pub async fn reload(&self) -> Result<()> {
        let Some(path) = &self.config_path else {
            return Err(GatewayError::config("未关联配置文件，无法重载"));
        };

        let mut config = Self::load_config_file(path)?;
        Self::apply_env_overrides(&mut config, &self.env_overrides)?;
        config.validate().map_err(GatewayError::config)?;
        *self.config.write().await = config;
        info!("手动重载配置成功");
        Ok(())
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(GatewayError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&config_content).map_err(|e| {
            GatewayError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 构建环境变量覆盖映射
    ///
    /// 例如: `MODERATION_GATEWAY_DATABASE_URL` -> `database.url`
    fn build_env_overrides(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        let overrides: HashMap<String, String> = vars
            .filter_map(|(key, value)| {
                let config_key = key.strip_prefix(ENV_PREFIX)?;
                if config_key == "CONFIG_PATH" {
                    return None;
                }
                Some((config_key.to_lowercase().replace('_', "."), value))
            })
            .collect();

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(config: &mut AppConfig, overrides: &HashMap<String, String>) -> Result<()> {
        for (path, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                path,
                if path.contains("token") || path.contains("key") {
                    "***"
                } else {
                    value
                }
            );
            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将环境变量覆盖应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["database", "url"] => config.database.url = value.to_string(),
            ["port"] | ["management", "port"] => {
                config.management.port = value.parse().map_err(|e| {
                    GatewayError::config_with_source(format!("无效的端口号: {value}"), e)
                })?;
            }
            ["admin", "token"] | ["management", "admin", "token"] => {
                config.management.admin_token = Some(value.to_string());
            }
            ["console", "base", "url"] => config.console.base_url = value.to_string(),
            ["console", "admin", "token"] => config.console.admin_token = Some(value.to_string()),
            ["moderation", "timeout", "seconds"] => {
                config.moderation.timeout_seconds = value.parse().map_err(|e| {
                    GatewayError::config_with_source(format!("无效的审查超时时间: {value}"), e)
                })?;
            }
            _ => {
                warn!("未知的配置路径，忽略环境变量覆盖: {}", path);
            }
        }

        Ok(())
    }
}
