//! # 拒绝响应
//!
//! 审查未通过时返回给客户端的内容，分为伪装成正常补全的回复和 400 错误两种。

use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// 以正常补全的形式返回拒绝消息
///
/// 流式请求返回单个 `chat.completion.chunk` 事件并以 `[DONE]` 结束。
#[must_use]
pub fn rejection_response(message: &str, model: &str, stream: bool) -> Response {
    let id = completion_id();
    let created = chrono::Utc::now().timestamp();

    if stream {
        let chunk = json!({
            "id": id,
            "object": "chat.completion.chunk",
            "created": created,
            "model": model,
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": message},
                "finish_reason": "stop"
            }]
        });
        let body = format!("data: {chunk}\n\ndata: [DONE]\n\n");
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    Json(json!({
        "id": id,
        "object": "chat.completion",
        "created": created,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": message},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
    }))
    .into_response()
}

/// 以 OpenAI 错误格式返回拒绝消息
#[must_use]
pub fn rejection_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "message": message,
                "type": "invalid_request_error",
                "code": "content_policy_violation"
            }
        })),
    )
        .into_response()
}
