//! # 管理服务器
//!
//! Axum HTTP服务器，提供选项管理API

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppContext;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};

/// 管理服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
    /// 是否启用CORS
    pub enable_cors: bool,
    /// 允许的CORS源地址
    pub cors_origins: Vec<String>,
    /// API前缀
    pub api_prefix: String,
    /// 管理令牌，设置后选项接口需要 Bearer 认证
    pub admin_token: Option<String>,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 9090,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            api_prefix: "/api".to_string(),
            admin_token: None,
        }
    }
}

/// 管理服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 管理服务器
pub struct ManagementServer {
    config: ManagementConfig,
    router: Router,
}

impl ManagementServer {
    /// 创建新的管理服务器
    #[must_use]
    pub fn new(config: ManagementConfig, context: Arc<AppContext>) -> Self {
        let router = Self::create_router(AppState::new(context), &config);
        Self { config, router }
    }

    /// 创建路由器
    pub fn create_router(state: AppState, config: &ManagementConfig) -> Router {
        let api_routes = super::routes::create_routes(state);

        let mut app = Router::new()
            .nest(&config.api_prefix, api_routes)
            .route("/ping", get(crate::management::handlers::system::ping_handler))
            .fallback(crate::management::handlers::system::not_found);

        let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());

        if config.enable_cors {
            let mut cors_layer = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                ]);

            if config.cors_origins.iter().any(|origin| origin == "*") {
                cors_layer = cors_layer.allow_origin(Any);
            } else {
                let origins = config
                    .cors_origins
                    .iter()
                    .map(|origin| origin.parse::<axum::http::HeaderValue>())
                    .collect::<std::result::Result<Vec<_>, _>>();

                match origins {
                    Ok(origins) => {
                        cors_layer = cors_layer.allow_origin(origins);
                    }
                    Err(e) => {
                        lwarn!(
                            "system",
                            LogStage::Startup,
                            LogComponent::ServerSetup,
                            "cors_config_fail",
                            &format!("Invalid CORS origin configuration: {e}, falling back to allow any")
                        );
                        cors_layer = cors_layer.allow_origin(Any);
                    }
                }
            }

            app = app.layer(service_builder.layer(cors_layer));
        } else {
            app = app.layer(service_builder);
        }

        app
    }

    /// 启动服务器
    pub async fn serve(self) -> Result<()> {
        let bind_address = &self.config.bind_address;
        let ip = bind_address.parse::<std::net::IpAddr>().map_err(|e| {
            GatewayError::config_with_source(
                format!("Invalid management bind address '{bind_address}'"),
                e,
            )
        })?;
        let addr = SocketAddr::new(ip, self.config.port);

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            GatewayError::server_start_with_source(format!("无法绑定管理端口 {addr}"), e)
        })?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "management_listening",
            &format!("管理服务器监听于 {addr}")
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::server_start_with_source("管理服务器运行失败", e))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lwarn!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "signal_listen_failed",
            &format!("无法监听退出信号: {e}")
        );
        std::future::pending::<()>().await;
    }
}
