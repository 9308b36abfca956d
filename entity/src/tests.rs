//! # 实体定义测试

use sea_orm::{EntityName, IdenStatic, Iterable, PrimaryKeyToColumn, Set, TryIntoModel};

use crate::options;

#[test]
fn test_options_table_layout() {
    assert_eq!(options::Entity.table_name(), "options");

    let keys: Vec<_> = options::PrimaryKey::iter()
        .map(|pk| pk.into_column().as_str())
        .collect();
    assert_eq!(keys, vec!["key"]);
    assert_eq!(options::Column::iter().count(), 3);
}

#[test]
fn test_option_active_model_into_model() {
    let now = chrono::Utc::now().naive_utc();
    let active = options::ActiveModel {
        key: Set("moderation_service".to_string()),
        value: Set("custom".to_string()),
        updated_at: Set(now),
    };

    let model = active.try_into_model().unwrap();
    assert_eq!(model.key, "moderation_service");
    assert_eq!(model.value, "custom");
    assert_eq!(model.updated_at, now);
}
