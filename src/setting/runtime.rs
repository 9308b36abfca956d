//! # 运行时审查配置

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::moderation::{DEFAULT_MODERATION_MODEL, ModerationService, ModerationSettings};

/// 安全审查豁免的选项键
pub mod exempt_keys {
    pub const ENABLED: &str = "safe_check_exempt_enabled";
    pub const GROUP: &str = "safe_check_exempt_group";
}

/// 内置审查服务的接入信息，不写入选项表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinEndpoint {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for BuiltinEndpoint {
    fn default() -> Self {
        Self {
            api_url: "https://moderate-api.be-a.dev/v1/moderations".to_string(),
            api_key: "sk-veloera-internal".to_string(),
            model: DEFAULT_MODERATION_MODEL.to_string(),
        }
    }
}

/// 请求期使用的审查配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationRuntimeConfig {
    pub service: ModerationService,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub auto_ban: bool,
    pub no_error: bool,
    pub reject_message: String,
}

impl ModerationRuntimeConfig {
    /// 解析运行时配置：内置服务使用内置接入信息，自定义服务原样使用
    #[must_use]
    pub fn resolve(settings: &ModerationSettings, builtin: &BuiltinEndpoint) -> Self {
        let (api_url, api_key, model) = match settings.service {
            ModerationService::Builtin => (
                builtin.api_url.clone(),
                builtin.api_key.clone(),
                builtin.model.clone(),
            ),
            ModerationService::Custom => (
                settings.api_url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
            ),
        };

        Self {
            service: settings.service,
            api_url,
            api_key,
            model,
            auto_ban: settings.auto_ban,
            no_error: settings.no_error,
            reject_message: settings.reject_message.clone(),
        }
    }
}

/// 安全审查豁免分组
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeCheckExempt {
    pub enabled: bool,
    pub group: String,
}

impl SafeCheckExempt {
    #[must_use]
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        Self {
            enabled: options
                .get(exempt_keys::ENABLED)
                .is_some_and(|v| v == "true"),
            group: options.get(exempt_keys::GROUP).cloned().unwrap_or_default(),
        }
    }

    /// 该分组的请求是否需要审查
    #[must_use]
    pub fn should_check_group(&self, group: &str) -> bool {
        !(self.enabled && group == self.group)
    }
}
