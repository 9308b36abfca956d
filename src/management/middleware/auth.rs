//! # 管理令牌中间件
//!
//! 配置了 `admin_token` 时，校验 `Authorization: Bearer <token>`。

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use crate::management::response;
use crate::management::server::AppState;

/// 从 `Authorization` 头提取 Bearer Token
#[must_use]
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum 管理令牌中间件
pub async fn admin_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state
        .config
        .management
        .admin_token
        .as_deref()
        .filter(|token| !token.is_empty())
    else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token);

    if provided == Some(expected) {
        return next.run(request).await;
    }

    lwarn!(
        "system",
        LogStage::RequestStart,
        LogComponent::ServerSetup,
        "admin_token_rejected",
        "管理令牌校验失败",
        path = request.uri().path().to_string()
    );
    response::app_error(GatewayError::management_auth("无效或缺失的管理令牌"))
}

#[cfg(test)]
mod tests {
    use super::extract_bearer_token;

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
