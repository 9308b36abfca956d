//! # 管理API模块
//!
//! 提供选项读写等管理接口

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use routes::create_routes;
pub use server::{AppState, ManagementConfig, ManagementServer};
