//! # 系统信息处理器

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::management::response;
use crate::management::server::AppState;

/// 全局启动时间
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 初始化启动时间
pub fn init_start_time() {
    START_TIME.set(Instant::now()).ok();
}

#[derive(Serialize)]
struct HealthStatus {
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    database: bool,
    options_loaded: usize,
}

/// 健康检查
pub async fn health_check(State(state): State<AppState>) -> axum::response::Response {
    let database = state
        .db
        .execute_unprepared("SELECT 1")
        .await
        .is_ok();

    response::success(HealthStatus {
        service: "moderation-gateway",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        database,
        options_loaded: state.options.all().await.len(),
    })
}

/// Ping 处理器
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// 未匹配路由
pub async fn not_found() -> axum::response::Response {
    response::error(StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND", "接口不存在")
}

/// 获取程序运行时间（秒）- 自动初始化
fn get_uptime_seconds() -> u64 {
    let start_time = START_TIME.get_or_init(Instant::now);
    start_time.elapsed().as_secs()
}
