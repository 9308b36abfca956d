//! # 系统选项
//!
//! 数据库持久化的通用 key/value 选项表及其内存快照

mod store;

pub use store::{OptionItem, OptionStore, is_sensitive_key};
