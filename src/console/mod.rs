//! # 审查设置面板
//!
//! 管理端审查设置表单的控制逻辑：维护可编辑副本与基线快照，
//! 提交时只写回发生变化的选项键。

pub mod client;
pub mod form;
pub mod notice;

pub use client::{HttpOptionsClient, OptionsBackend, OptionsSource, RefreshHandle};
pub use form::{FieldEdit, ModerationSettingsForm, SubmitOutcome};
pub use notice::{Notice, NoticeLevel, Notifier};
