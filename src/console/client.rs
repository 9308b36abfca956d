//! # 选项接口客户端

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConsoleConfig;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::options::OptionItem;
use crate::{ldebug, lwarn};

/// 选项写入端
#[async_trait]
pub trait OptionsBackend: Send + Sync {
    /// 写入单个选项，值已是文本形式
    async fn update_option(&self, key: &str, value: &str) -> Result<()>;
}

/// 选项读取端
#[async_trait]
pub trait OptionsSource: Send + Sync {
    async fn fetch_options(&self) -> Result<HashMap<String, String>>;
}

/// 外部选项存储的刷新回调
#[async_trait]
pub trait RefreshHandle: Send + Sync {
    async fn refresh(&self);
}

#[derive(Serialize)]
struct UpdateOptionBody<'a> {
    key: &'a str,
    value: &'a str,
}

/// 选项接口的响应信封，只认 `success`/`message`/`data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

/// 基于 HTTP 的选项客户端，对接 `GET/PUT /api/option/`
#[derive(Debug, Clone)]
pub struct HttpOptionsClient {
    http: reqwest::Client,
    option_url: Url,
}

impl HttpOptionsClient {
    pub fn new(base_url: &str, admin_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let option_url = Url::parse(&base)
            .and_then(|url| url.join("api/option/"))
            .map_err(|e| GatewayError::config_with_source(format!("无效的网关地址: {base_url}"), e))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = admin_token.filter(|token| !token.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| GatewayError::config_with_source("管理令牌包含非法字符", e))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, option_url })
    }

    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.admin_token.as_deref(),
            Duration::from_secs(config.request_timeout),
        )
    }

    /// 将非 2xx 响应转换为错误，尽量带上服务端的错误消息
    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|body| body.error.map(|e| e.message).or(body.message))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        GatewayError::network(format!("选项接口返回 {status}: {message}"))
    }
}

#[async_trait]
impl OptionsBackend for HttpOptionsClient {
    async fn update_option(&self, key: &str, value: &str) -> Result<()> {
        ldebug!(
            "console",
            LogStage::ExternalApi,
            LogComponent::OptionsClient,
            "put_option",
            "写入选项",
            key = key
        );

        let response = self
            .http
            .put(self.option_url.clone())
            .json(&UpdateOptionBody { key, value })
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            lwarn!(
                "console",
                LogStage::ExternalApi,
                LogComponent::OptionsClient,
                "put_option_failed",
                &err.to_string(),
                key = key
            );
            return Err(err);
        }

        let body: Envelope<serde_json::Value> = response.json().await?;
        if !body.success {
            return Err(GatewayError::network(format!(
                "选项 {key} 保存失败: {}",
                body.message.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OptionsSource for HttpOptionsClient {
    async fn fetch_options(&self) -> Result<HashMap<String, String>> {
        let response = self.http.get(self.option_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: Envelope<Vec<OptionItem>> = response.json().await?;
        if !body.success {
            return Err(GatewayError::network(format!(
                "读取选项失败: {}",
                body.message.unwrap_or_default()
            )));
        }

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|item| (item.key, item.value))
            .collect())
    }
}
