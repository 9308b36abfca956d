//! # 审查试运行处理器
//!
//! 用当前选项对一段聊天请求执行审查，返回客户端实际会看到的响应。

use axum::Json;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use crate::management::response;
use crate::management::server::AppState;
use crate::moderation::{Verdict, collect_message_texts};

/// 被封禁时附加的响应头
pub const BAN_HEADER: &str = "x-moderation-ban-user";

fn default_group() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ModerationCheckRequest {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub is_admin: bool,
    /// OpenAI 格式的聊天请求体
    pub request: Value,
}

#[derive(Debug, Serialize)]
struct PassedVerdict {
    verdict: &'static str,
}

/// `POST /api/moderation/check`
pub async fn check_moderation(
    State(state): State<AppState>,
    Json(request): Json<ModerationCheckRequest>,
) -> Response {
    let inputs = collect_message_texts(&request.request);
    let gate = state.moderation_gate().await;

    match gate.evaluate(&request.group, request.is_admin, &inputs).await {
        Ok(Verdict::Exempt) => response::success(PassedVerdict { verdict: "exempt" }),
        Ok(Verdict::Allowed) => response::success(PassedVerdict { verdict: "allowed" }),
        Ok(Verdict::Rejected(rejection)) => {
            let model = request
                .request
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let stream = request
                .request
                .get("stream")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let ban_user = rejection.ban_user;

            let mut response = rejection.into_response(model, stream);
            if ban_user {
                response
                    .headers_mut()
                    .insert(BAN_HEADER, HeaderValue::from_static("true"));
            }
            response
        }
        Err(err) => {
            lwarn!(
                "system",
                LogStage::ExternalApi,
                LogComponent::Moderation,
                "moderation_check_failed",
                &format!("审查调用失败: {err}")
            );
            response::app_error(err)
        }
    }
}
