//! # 审查设置记录
//!
//! 选项表中 `moderation_*` 键的强类型视图。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ensure_valid;
use crate::error::{GatewayError, Result};

/// 自定义服务未填写模型时使用的默认模型
pub const DEFAULT_MODERATION_MODEL: &str = "text-moderation-latest";

/// 默认拒绝消息
pub const DEFAULT_REJECT_MESSAGE: &str = "This request may violate our Terms of Use. If you have any questions, please contact the site administrator.";

/// 选项键名
pub mod keys {
    pub const SERVICE: &str = "moderation_service";
    pub const API_URL: &str = "moderation_api_url";
    pub const API_KEY: &str = "moderation_api_key";
    pub const MODEL: &str = "moderation_model";
    pub const AUTO_BAN: &str = "moderation_auto_ban";
    pub const NO_ERROR: &str = "moderation_no_error";
    pub const REJECT_MESSAGE: &str = "moderation_reject_message";

    /// 按声明顺序列出的全部审查键
    pub const ALL: [&str; 7] = [
        SERVICE,
        API_URL,
        API_KEY,
        MODEL,
        AUTO_BAN,
        NO_ERROR,
        REJECT_MESSAGE,
    ];

    /// 布尔类型的键
    pub const BOOLEAN: [&str; 2] = [AUTO_BAN, NO_ERROR];
}

/// 审查服务来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationService {
    /// 内置免费审查服务
    #[default]
    #[serde(alias = "veloera")]
    Builtin,
    /// 自有 OpenAI 兼容审查服务
    Custom,
}

impl ModerationService {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Custom => "custom",
        }
    }

    #[must_use]
    pub const fn is_builtin(self) -> bool {
        matches!(self, Self::Builtin)
    }
}

impl fmt::Display for ModerationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationService {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "builtin" | "veloera" => Ok(Self::Builtin),
            "custom" => Ok(Self::Custom),
            other => Err(GatewayError::management_validation(
                format!("未知的审查服务来源: {other}"),
                Some(keys::SERVICE.to_string()),
            )),
        }
    }
}

/// 单个选项的更新请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionUpdate {
    pub key: String,
    pub value: String,
}

/// 审查设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationSettings {
    pub service: ModerationService,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub auto_ban: bool,
    pub no_error: bool,
    pub reject_message: String,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            service: ModerationService::Builtin,
            api_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            auto_ban: false,
            no_error: false,
            reject_message: DEFAULT_REJECT_MESSAGE.to_string(),
        }
    }
}

impl ModerationSettings {
    /// 从选项表快照投影出审查设置
    ///
    /// 只识别 `moderation_*` 键，缺失的键保留默认值，投影结果已满足服务来源约束。
    #[must_use]
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        let mut settings = Self::default();
        for key in keys::ALL {
            if let Some(value) = options.get(key) {
                settings.assign(key, value);
            }
        }
        settings.normalize();
        settings
    }

    fn assign(&mut self, key: &str, value: &str) {
        match key {
            keys::SERVICE => {
                self.service = value.parse().unwrap_or_default();
            }
            keys::API_URL => value.clone_into(&mut self.api_url),
            keys::API_KEY => value.clone_into(&mut self.api_key),
            keys::MODEL => value.clone_into(&mut self.model),
            keys::AUTO_BAN => self.auto_ban = parse_bool(value),
            keys::NO_ERROR => self.no_error = parse_bool(value),
            keys::REJECT_MESSAGE => value.clone_into(&mut self.reject_message),
            _ => {}
        }
    }

    /// 应用服务来源约束
    ///
    /// 内置服务清空 URL、Key 和模型；自定义服务的空模型回落为默认模型。
    pub fn normalize(&mut self) {
        match self.service {
            ModerationService::Builtin => {
                self.api_url.clear();
                self.api_key.clear();
                self.model.clear();
            }
            ModerationService::Custom => {
                if self.model.is_empty() {
                    DEFAULT_MODERATION_MODEL.clone_into(&mut self.model);
                }
            }
        }
    }

    /// 切换服务来源并立即应用约束
    pub fn set_service(&mut self, service: ModerationService) {
        self.service = service;
        self.normalize();
    }

    /// 校验设置是否可以保存
    pub fn validate(&self) -> Result<()> {
        if self.service.is_builtin() {
            return Ok(());
        }

        ensure_valid!(!self.api_url.trim().is_empty(), keys::API_URL, "请输入完整 URL");
        ensure_valid!(
            url::Url::parse(self.api_url.trim()).is_ok(),
            keys::API_URL,
            format!("请输入合法 URL: {}", self.api_url)
        );
        ensure_valid!(!self.api_key.trim().is_empty(), keys::API_KEY, "请输入 API Key");
        ensure_valid!(!self.model.trim().is_empty(), keys::MODEL, "请输入模型");
        Ok(())
    }

    /// 以文本形式导出全部选项，布尔值为 `"true"`/`"false"`
    #[must_use]
    pub fn to_option_values(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::SERVICE, self.service.as_str().to_string()),
            (keys::API_URL, self.api_url.clone()),
            (keys::API_KEY, self.api_key.clone()),
            (keys::MODEL, self.model.clone()),
            (keys::AUTO_BAN, self.auto_ban.to_string()),
            (keys::NO_ERROR, self.no_error.to_string()),
            (keys::REJECT_MESSAGE, self.reject_message.clone()),
        ]
    }

    /// 计算相对基线发生变化的键
    #[must_use]
    pub fn diff(&self, baseline: &Self) -> Vec<OptionUpdate> {
        self.to_option_values()
            .into_iter()
            .zip(baseline.to_option_values())
            .filter(|((_, current), (_, previous))| current != previous)
            .map(|((key, value), _)| OptionUpdate {
                key: key.to_string(),
                value,
            })
            .collect()
    }
}

/// 选项表里的布尔值只认 `"true"`
fn parse_bool(value: &str) -> bool {
    value == "true"
}

/// 校验写入选项表的单个审查键
///
/// 非审查键原样放行。
pub fn validate_option_value(key: &str, value: &str) -> Result<()> {
    match key {
        keys::SERVICE => value.parse::<ModerationService>().map(|_| ()),
        keys::AUTO_BAN | keys::NO_ERROR => {
            ensure_valid!(
                matches!(value, "true" | "false"),
                key,
                format!("{key} 只接受 true 或 false")
            );
            Ok(())
        }
        keys::API_URL if !value.is_empty() => {
            ensure_valid!(
                url::Url::parse(value).is_ok(),
                key,
                format!("请输入合法 URL: {value}")
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn builtin_snapshot_clears_dependent_fields() {
        let settings = ModerationSettings::from_options(&options(&[
            (keys::SERVICE, "builtin"),
            (keys::API_URL, "https://mod.example.com/v1/moderations"),
            (keys::API_KEY, "sk-leftover"),
            (keys::MODEL, "omni-moderation-latest"),
        ]));

        assert_eq!(settings.service, ModerationService::Builtin);
        assert_eq!(settings.api_url, "");
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.model, "");
    }

    #[test]
    fn legacy_service_name_maps_to_builtin() {
        let settings = ModerationSettings::from_options(&options(&[
            (keys::SERVICE, "veloera"),
            (keys::API_KEY, "sk-leftover"),
        ]));
        assert_eq!(settings.service, ModerationService::Builtin);
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn custom_snapshot_defaults_empty_model() {
        let settings = ModerationSettings::from_options(&options(&[
            (keys::SERVICE, "custom"),
            (keys::API_URL, "https://mod.example.com/v1/moderations"),
            (keys::API_KEY, "sk-test"),
            (keys::MODEL, ""),
        ]));

        assert_eq!(settings.model, DEFAULT_MODERATION_MODEL);
        assert_eq!(settings.api_key, "sk-test");
    }

    #[test]
    fn unrecognized_keys_are_ignored_and_missing_keep_defaults() {
        let settings = ModerationSettings::from_options(&options(&[
            ("theme", "dark"),
            (keys::AUTO_BAN, "true"),
        ]));

        assert!(settings.auto_ban);
        assert!(!settings.no_error);
        assert_eq!(settings.reject_message, DEFAULT_REJECT_MESSAGE);
    }

    #[rstest]
    #[case("true", true)]
    #[case("false", false)]
    #[case("TRUE", false)]
    #[case(" true", false)]
    #[case("1", false)]
    fn boolean_options_match_exact_text(#[case] raw: &str, #[case] expected: bool) {
        let settings = ModerationSettings::from_options(&options(&[
            (keys::AUTO_BAN, raw),
            (keys::NO_ERROR, raw),
        ]));
        assert_eq!(settings.auto_ban, expected);
        assert_eq!(settings.no_error, expected);
    }

    #[test]
    fn switching_to_builtin_clears_credentials() {
        let mut settings = ModerationSettings::from_options(&options(&[
            (keys::SERVICE, "custom"),
            (keys::API_URL, "https://mod.example.com"),
            (keys::API_KEY, "sk-test"),
        ]));

        settings.set_service(ModerationService::Builtin);
        assert!(settings.api_url.is_empty());
        assert!(settings.api_key.is_empty());
        assert!(settings.model.is_empty());

        settings.set_service(ModerationService::Custom);
        assert_eq!(settings.model, DEFAULT_MODERATION_MODEL);
    }

    #[rstest]
    #[case("", "sk", "m", keys::API_URL)]
    #[case("not a url", "sk", "m", keys::API_URL)]
    #[case("https://mod.example.com", "", "m", keys::API_KEY)]
    #[case("https://mod.example.com", "sk", " ", keys::MODEL)]
    fn custom_validation_reports_field(
        #[case] url: &str,
        #[case] key: &str,
        #[case] model: &str,
        #[case] field: &str,
    ) {
        let settings = ModerationSettings {
            service: ModerationService::Custom,
            api_url: url.to_string(),
            api_key: key.to_string(),
            model: model.to_string(),
            ..ModerationSettings::default()
        };

        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn builtin_is_always_valid() {
        assert!(ModerationSettings::default().validate().is_ok());
    }

    #[test]
    fn diff_reports_changed_keys_with_text_values() {
        let baseline = ModerationSettings::default();
        let mut current = baseline.clone();
        current.auto_ban = true;
        current.reject_message = "blocked".to_string();

        assert_eq!(
            current.diff(&baseline),
            vec![
                OptionUpdate {
                    key: keys::AUTO_BAN.to_string(),
                    value: "true".to_string(),
                },
                OptionUpdate {
                    key: keys::REJECT_MESSAGE.to_string(),
                    value: "blocked".to_string(),
                },
            ]
        );
        assert!(baseline.diff(&baseline).is_empty());
    }

    #[rstest]
    #[case(keys::SERVICE, "custom", true)]
    #[case(keys::SERVICE, "openai", false)]
    #[case(keys::AUTO_BAN, "false", true)]
    #[case(keys::NO_ERROR, "yes", false)]
    #[case(keys::API_URL, "", true)]
    #[case(keys::API_URL, "mod.example.com", false)]
    #[case("site_name", "anything", true)]
    fn option_value_validation(#[case] key: &str, #[case] value: &str, #[case] ok: bool) {
        assert_eq!(validate_option_value(key, value).is_ok(), ok);
    }
}
