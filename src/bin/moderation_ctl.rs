//! # moderation-ctl
//!
//! 命令行版审查设置面板：读取网关上的选项，编辑后只提交变化的键

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tokio::sync::Mutex;

use moderation_gateway::{
    Result,
    config::{ConfigManager, ConsoleConfig},
    console::{
        FieldEdit, HttpOptionsClient, ModerationSettingsForm, Notice, NoticeLevel, Notifier,
        OptionsSource, RefreshHandle, SubmitOutcome,
    },
    lwarn,
    logging::{self, LogComponent, LogStage},
    setting::ModerationService,
};

#[derive(Debug, Parser)]
#[command(name = "moderation-ctl", version, about = "审查设置面板")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 网关管理地址，覆盖配置中的 console.base_url
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// 管理令牌，覆盖配置中的 console.admin_token
    #[arg(long, global = true, env = "MODERATION_GATEWAY_ADMIN_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 显示当前审查设置
    Show,
    /// 修改审查设置
    Set(SetArgs),
}

#[derive(Debug, Args)]
struct SetArgs {
    /// 审查服务来源: builtin 或 custom
    #[arg(long)]
    service: Option<String>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    auto_ban: Option<bool>,
    #[arg(long)]
    no_error: Option<bool>,
    #[arg(long)]
    reject_message: Option<String>,
}

impl SetArgs {
    /// 服务来源放在最前，保证切换后的约束先生效
    fn edits(self) -> Result<Vec<FieldEdit>> {
        let mut edits = Vec::new();
        if let Some(service) = self.service {
            edits.push(FieldEdit::Service(service.parse::<ModerationService>()?));
        }
        edits.extend(self.api_url.map(FieldEdit::ApiUrl));
        edits.extend(self.api_key.map(FieldEdit::ApiKey));
        edits.extend(self.model.map(FieldEdit::Model));
        edits.extend(self.auto_ban.map(FieldEdit::AutoBan));
        edits.extend(self.no_error.map(FieldEdit::NoError));
        edits.extend(self.reject_message.map(FieldEdit::RejectMessage));
        Ok(edits)
    }
}

/// 终端通知
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("{notice}"),
            NoticeLevel::Warning | NoticeLevel::Error => eprintln!("{notice}"),
        }
    }
}

/// 远端选项存储：刷新时重新拉取快照
struct RemoteOptionsStore<'a> {
    client: &'a HttpOptionsClient,
    latest: Mutex<Option<HashMap<String, String>>>,
}

#[async_trait]
impl<'a> RefreshHandle for RemoteOptionsStore<'a> {
    async fn refresh(&self) {
        match self.client.fetch_options().await {
            Ok(options) => *self.latest.lock().await = Some(options),
            Err(e) => lwarn!(
                "console",
                LogStage::ExternalApi,
                LogComponent::OptionsClient,
                "refresh_failed",
                &format!("刷新选项失败: {e}")
            ),
        }
    }
}

async fn console_config(cli: &Cli) -> Result<ConsoleConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path).await?,
        None => ConfigManager::new().await?,
    };
    let mut console = manager.get_config().await.console;
    if let Some(base_url) = &cli.base_url {
        console.base_url.clone_from(base_url);
    }
    if cli.token.is_some() {
        console.admin_token.clone_from(&cli.token);
    }
    Ok(console)
}

fn print_settings(form: &ModerationSettingsForm) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(form.inputs())?);
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let console = console_config(&cli).await?;
    let client = HttpOptionsClient::from_config(&console)?;
    let mut form = ModerationSettingsForm::from_options(&client.fetch_options().await?);

    let args = match cli.command {
        Command::Show => {
            print_settings(&form)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Set(args) => args,
    };

    for edit in args.edits()? {
        form.apply(edit);
    }

    let store = RemoteOptionsStore {
        client: &client,
        latest: Mutex::new(None),
    };
    let outcome = form.submit(&client, &store, &ConsoleNotifier).await;

    if let Some(options) = store.latest.lock().await.take() {
        form.sync_from_options(&options);
    }
    if matches!(outcome, SubmitOutcome::Saved { .. }) {
        print_settings(&form)?;
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_level = std::env::var("MODERATION_CTL_LOG").unwrap_or_else(|_| "warn".to_string());
    logging::init_optimized_logging(Some(&log_level));

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::FAILURE
        }
    }
}
