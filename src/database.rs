//! # 数据库模块
//!
//! 数据库连接和迁移管理

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::error::Result;

const URL_PREVIEW_CHARS: usize = 50;

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let url = config.get_connection_url()?;
    info!("正在连接数据库: {}", url_preview(&url));

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .sqlx_logging(false);
    // 每个连接都是独立的内存库
    if config.is_memory_database() {
        options.max_connections(1);
    }

    let db = Database::connect(options).await?;

    info!("数据库连接成功");
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> std::result::Result<(), DbErr> {
    info!("开始运行数据库迁移...");

    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            info!("数据库迁移完成");
            Ok(())
        }
        Err(e) => {
            error!("数据库迁移失败: {}", e);
            Err(e)
        }
    }
}

/// 日志中展示的连接串前缀，按字符截断
fn url_preview(url: &str) -> String {
    url.chars().take(URL_PREVIEW_CHARS).collect()
}
