//! # 选项存储

use std::collections::HashMap;
use std::sync::Arc;

use entity::{options, options::Entity as Options};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Context, GatewayError, Result};
use crate::logging::{LogComponent, LogStage, mask_secret};
use crate::setting::moderation::validate_option_value;
use crate::setting::{BuiltinEndpoint, ModerationRuntimeConfig, ModerationSettings, SafeCheckExempt};
use crate::{ensure_valid, linfo};

/// 选项键最大长度，与迁移中的列宽一致
const MAX_KEY_LEN: usize = 100;

/// 对外展示的选项条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub key: String,
    pub value: String,
}

/// 敏感键在列表接口中脱敏
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    key.ends_with("_api_key") || key.ends_with("_token") || key.ends_with("_secret")
}

/// 选项存储
///
/// 写入先落库再更新内存快照；读取只走快照。
#[derive(Clone)]
pub struct OptionStore {
    db: Arc<DatabaseConnection>,
    snapshot: Arc<RwLock<HashMap<String, String>>>,
}

impl OptionStore {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            snapshot: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 从数据库加载全部选项，返回条目数
    pub async fn load(&self) -> Result<usize> {
        let rows = Options::find()
            .all(self.db.as_ref())
            .await
            .context("加载选项失败")?;

        let loaded: HashMap<String, String> =
            rows.into_iter().map(|row| (row.key, row.value)).collect();
        let count = loaded.len();
        *self.snapshot.write().await = loaded;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::OptionStore,
            "options_loaded",
            &format!("已加载 {count} 个选项")
        );
        Ok(count)
    }

    /// 当前快照
    pub async fn all(&self) -> HashMap<String, String> {
        self.snapshot.read().await.clone()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.snapshot.read().await.get(key).cloned()
    }

    /// 按键排序、敏感值脱敏后的列表
    pub async fn list_masked(&self) -> Vec<OptionItem> {
        let snapshot = self.snapshot.read().await;
        let mut items: Vec<OptionItem> = snapshot
            .iter()
            .map(|(key, value)| OptionItem {
                key: key.clone(),
                value: if is_sensitive_key(key) {
                    mask_secret(value)
                } else {
                    value.clone()
                },
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        items
    }

    /// 写入单个选项
    pub async fn update(&self, key: &str, value: &str) -> Result<()> {
        let key = key.trim();
        ensure_valid!(!key.is_empty(), "key", "选项键不能为空");
        ensure_valid!(
            key.len() <= MAX_KEY_LEN,
            "key",
            format!("选项键长度不能超过 {MAX_KEY_LEN}")
        );
        validate_option_value(key, value)?;

        let model = options::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        };

        // 写锁覆盖数据库写入，保证快照与表内顺序一致
        let mut snapshot = self.snapshot.write().await;
        Options::insert(model)
            .on_conflict(
                OnConflict::column(options::Column::Key)
                    .update_columns([options::Column::Value, options::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| GatewayError::database_with_source(format!("保存选项 {key} 失败"), e))?;

        snapshot.insert(key.to_string(), value.to_string());
        drop(snapshot);

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::OptionStore,
            "option_updated",
            "选项已更新",
            key = key,
            value = if is_sensitive_key(key) {
                mask_secret(value)
            } else {
                value.to_string()
            }
        );
        Ok(())
    }

    /// 当前审查设置
    pub async fn moderation_settings(&self) -> ModerationSettings {
        ModerationSettings::from_options(&*self.snapshot.read().await)
    }

    /// 当前运行时审查配置
    pub async fn runtime_config(&self, builtin: &BuiltinEndpoint) -> ModerationRuntimeConfig {
        ModerationRuntimeConfig::resolve(&self.moderation_settings().await, builtin)
    }

    /// 当前安全审查豁免设置
    pub async fn safe_check_exempt(&self) -> SafeCheckExempt {
        SafeCheckExempt::from_options(&*self.snapshot.read().await)
    }
}
