//! # 路由配置
//!
//! 定义所有API路由和路由组织

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::management::handlers::{moderation, options, system};
use crate::management::middleware::admin_token;
use crate::management::server::AppState;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(system::health_check))
        .merge(option_routes(state.clone()))
        .merge(moderation_routes(state.clone()))
        .with_state(state)
}

/// 选项管理路由
///
/// 同时接受 `/option` 与 `/option/`，管理前端习惯带尾斜杠。
fn option_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/option",
            get(options::list_options).put(options::update_option),
        )
        .route(
            "/option/",
            get(options::list_options).put(options::update_option),
        )
        .route_layer(from_fn_with_state(state, admin_token))
}

/// 审查试运行路由
fn moderation_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/moderation/check", post(moderation::check_moderation))
        .route_layer(from_fn_with_state(state, admin_token))
}
