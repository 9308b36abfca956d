//! # Moderation Gateway Library
//!
//! 内容审查网关核心库：选项存储、审查设置面板与请求侧审查流程

pub mod app;
pub mod config;
pub mod console;
pub mod database;
pub mod error;
pub mod logging;
pub mod management;
pub mod moderation;
pub mod options;
pub mod setting;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{GatewayError, Result};
