//! # 审查设置
//!
//! 审查设置记录、与通用选项表之间的投影，以及运行时解析

pub mod moderation;
pub mod runtime;

pub use moderation::{
    DEFAULT_MODERATION_MODEL, DEFAULT_REJECT_MESSAGE, ModerationService, ModerationSettings,
    OptionUpdate, keys,
};
pub use runtime::{BuiltinEndpoint, ModerationRuntimeConfig, SafeCheckExempt};
