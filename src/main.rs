//! URL Vitals 主程序入口
//!
//! 批量URL存活检测工具

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info};
use url_vitals::cli::args::{Args, Commands};
use url_vitals::cli::commands::{
    CheckCommand, Command, InitCommand, ServeCommand, ValidateCommand, VersionCommand,
};
use url_vitals::config::{self, Config};
use url_vitals::logging::{LogConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 日志系统依赖配置中的级别，先加载配置，出错时延后报告
    let loaded = config::load_or_default(args.config.as_deref()).await;

    let mut log_config = match &loaded {
        Ok((config, _)) => LogConfig::from_global(&config.global),
        Err(_) => LogConfig::default(),
    };
    if let Some(level) = args.log_level {
        log_config.level = level.into();
    }
    log_config.json_format |= args.json_logs;

    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("URL Vitals v{} 启动", url_vitals::VERSION);
    match &loaded {
        Ok((_, Some(path))) => info!("已加载配置文件: {}", path.display()),
        Ok((_, None)) => debug!("未找到配置文件，使用默认配置"),
        Err(_) => {}
    }

    let loaded = loaded.map(|(config, _)| config);

    if let Err(e) = execute_command(&args, loaded, Arc::new(logging_system)).await {
        error!("命令执行失败: {:#}", e);
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(
    args: &Args,
    loaded: url_vitals::error::Result<Config>,
    logging_system: Arc<LoggingSystem>,
) -> Result<()> {
    match &args.command {
        Commands::Check { .. } => {
            let config = require_config(args, loaded)?;
            CheckCommand::new(config, logging_system)
                .execute(args)
                .await
                .context("批量检测失败")
        }
        Commands::Serve { .. } => {
            let config = require_config(args, loaded)?;
            ServeCommand::new(config, logging_system)
                .execute(args)
                .await
                .context("HTTP检测服务运行失败")
        }
        Commands::Init { .. } => InitCommand.execute(args).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Validate { .. } => ValidateCommand
            .execute(args)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Version { .. } => VersionCommand
            .execute(args)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
    }
}

/// 需要配置的命令在这里报告配置加载错误
fn require_config(args: &Args, loaded: url_vitals::error::Result<Config>) -> Result<Config> {
    loaded.with_context(|| {
        format!(
            "加载配置文件失败: {}\n提示：请运行 'url-vitals validate' 检查配置文件",
            args.get_config_path().display()
        )
    })
}
