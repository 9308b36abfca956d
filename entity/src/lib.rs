//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod options;

pub use options::Entity as Options;

#[cfg(test)]
mod tests;
