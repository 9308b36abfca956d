//! # 内容审查
//!
//! 请求侧的审查流程：调用 OpenAI 兼容的 moderation 接口，
//! 按选项决定放行、拒绝以及拒绝的返回方式。

pub mod client;
pub mod gate;
pub mod rejection;

pub use client::{ModerationClient, collect_message_texts};
pub use gate::{ModerationGate, Rejection, Verdict};
pub use rejection::{rejection_error, rejection_response};
