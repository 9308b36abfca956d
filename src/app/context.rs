//! 应用上下文
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::error::Result;
use crate::moderation::{ModerationClient, ModerationGate};
use crate::options::OptionStore;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub options: OptionStore,
    pub moderation: ModerationClient,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Result<Self> {
        let options = OptionStore::new(Arc::clone(&db));
        let moderation =
            ModerationClient::new(Duration::from_secs(config.moderation.timeout_seconds))?;
        Ok(Self {
            config,
            db,
            options,
            moderation,
        })
    }

    /// 按当前选项快照构建审查关卡
    pub async fn moderation_gate(&self) -> ModerationGate {
        ModerationGate::new(
            self.moderation.clone(),
            self.options.runtime_config(&self.config.moderation.builtin).await,
            self.options.safe_check_exempt().await,
        )
    }
}
