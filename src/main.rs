//! # Moderation Gateway 主程序
//!
//! 加载配置、准备数据库与选项快照，然后启动管理服务器

use std::sync::Arc;

use moderation_gateway::{
    GatewayError, Result,
    app::AppContext,
    config::ConfigManager,
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
    management::ManagementServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    logging::init_optimized_logging(None);

    moderation_gateway::management::handlers::system::init_start_time();

    let context = match bootstrap().await {
        Ok(context) => context,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "bootstrap_failed",
                &format!("启动准备失败: {e}")
            );
            return Err(e);
        }
    };

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动"
    );
    let server = ManagementServer::new(context.config.management.clone(), context);
    if let Err(e) = server.serve().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

/// 加载配置、连接数据库、执行迁移并载入选项
async fn bootstrap() -> Result<Arc<AppContext>> {
    let config_manager = ConfigManager::new().await?;
    let config = config_manager.get_config().await;
    config.validate().map_err(GatewayError::config)?;

    let db = database::init_database(&config.database).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "run_migrations",
        "执行数据库迁移..."
    );
    database::run_migrations(&db).await?;

    let context = AppContext::new(Arc::new(config), Arc::new(db))?;
    context.options.load().await?;

    let settings = context.options.moderation_settings().await;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Moderation,
        "moderation_settings",
        "当前审查设置",
        service = settings.service.as_str(),
        auto_ban = settings.auto_ban,
        no_error = settings.no_error
    );

    Ok(Arc::new(context))
}
