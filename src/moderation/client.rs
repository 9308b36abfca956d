//! # 审查接口客户端

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage, mask_secret};
use crate::setting::ModerationRuntimeConfig;
use crate::{ldebug, lwarn};

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    flagged: bool,
    #[serde(default)]
    results: Vec<ModerationResult>,
}

impl ModerationResponse {
    fn is_flagged(&self) -> bool {
        self.flagged || self.results.iter().any(|r| r.flagged)
    }
}

/// OpenAI 兼容的审查接口客户端
#[derive(Debug, Clone)]
pub struct ModerationClient {
    http: reqwest::Client,
}

impl ModerationClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::moderation_with_source("创建审查客户端失败", e))?;
        Ok(Self { http })
    }

    /// 检查文本是否被标记
    ///
    /// 空文本会被跳过，全部为空时不发请求。
    pub async fn check(&self, config: &ModerationRuntimeConfig, inputs: &[String]) -> Result<bool> {
        let input: Vec<&str> = inputs
            .iter()
            .map(String::as_str)
            .filter(|text| !text.is_empty())
            .collect();
        if input.is_empty() {
            return Ok(false);
        }

        ldebug!(
            "moderation",
            LogStage::ExternalApi,
            LogComponent::Moderation,
            "check",
            "发送审查请求",
            url = config.api_url,
            api_key = mask_secret(&config.api_key),
            inputs = input.len()
        );

        let response = self
            .http
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&ModerationRequest {
                model: &config.model,
                input,
            })
            .send()
            .await
            .map_err(|e| GatewayError::moderation_with_source("审查请求失败", e))?;

        let status = response.status();
        if !status.is_success() {
            lwarn!(
                "moderation",
                LogStage::ExternalApi,
                LogComponent::Moderation,
                "check_failed",
                "审查接口返回错误状态",
                status = status.as_u16()
            );
            return Err(GatewayError::moderation(format!("审查接口返回 {status}")));
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::moderation_with_source("审查响应解析失败", e))?;
        Ok(body.is_flagged())
    }
}

/// 从聊天请求体中取出待审查的文本
///
/// 支持字符串内容与多段内容里的 `text` 片段。
#[must_use]
pub fn collect_message_texts(body: &Value) -> Vec<String> {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return Vec::new();
    };

    messages
        .iter()
        .filter_map(|message| message.get("content"))
        .filter_map(|content| match content {
            Value::String(text) => Some(text.clone()),
            Value::Array(parts) => {
                let text = parts
                    .iter()
                    .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n");
                Some(text)
            }
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect()
}
