//! # 管理接口处理器

pub mod moderation;
pub mod options;
pub mod system;
