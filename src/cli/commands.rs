//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::checker::{BatchChecker, BatchProgress, BatchSummary, CheckResult, ProgressCallback};
use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{default_config_template, Config, ConfigLoader, TomlConfigLoader};
use crate::error::{Result, UrlVitalsError};
use crate::logging::LoggingSystem;
use crate::web::{WebAppState, WebServer};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, default_config_template()).await?;

        println!("配置文件已创建: {}", config_path.display());
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::default();
        let config = loader.load_from_file(config_path).await?;

        println!("✓ 配置文件验证通过");

        if verbose {
            println!("检测配置:");
            println!("  并发数: {}", config.checker.concurrency);
            println!("  超时时间: {}ms", config.checker.timeout_ms);
            println!("  探测方法: {}", config.checker.method);
            println!(
                "  跟随重定向: {}",
                if config.checker.follow_redirects {
                    format!("是（最多 {} 次）", config.checker.max_redirects)
                } else {
                    "否".to_string()
                }
            );
            println!("  额外请求头: {} 个", config.checker.headers.len());
            println!("Web配置:");
            println!(
                "  监听地址: {}:{}",
                config.web.bind_address, config.web.port
            );
            println!("  单次最大URL数: {}", config.web.max_batch_size);
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand {
    /// 已加载的配置
    config: Config,
    /// 日志系统
    logging: Arc<LoggingSystem>,
}

impl CheckCommand {
    /// 创建检测命令
    pub fn new(config: Config, logging: Arc<LoggingSystem>) -> Self {
        Self { config, logging }
    }
}

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check {
            urls,
            file,
            format,
            concurrency,
            timeout_ms,
            method,
            progress,
        } = &args.command
        else {
            return Ok(());
        };

        let mut checker_config = self.config.checker.clone();
        if let Some(concurrency) = concurrency {
            checker_config.concurrency = *concurrency;
        }
        if let Some(timeout_ms) = timeout_ms {
            checker_config.timeout_ms = *timeout_ms;
        }
        if let Some(method) = method {
            checker_config.method = (*method).into();
        }

        let checker = BatchChecker::new(&checker_config)?;

        let mut targets = urls.clone();
        if let Some(path) = file {
            targets.extend(read_url_list(path).await?);
        }

        if targets.is_empty() {
            warn!("没有需要检测的URL");
        }

        let callback: Option<ProgressCallback> = progress.then(|| {
            Arc::new(|p: &BatchProgress| {
                eprint!(
                    "\r[{}/{}] {:>3.0}% {}\x1b[K",
                    p.completed,
                    p.total,
                    p.fraction() * 100.0,
                    p.url
                );
                let _ = std::io::stderr().flush();
            }) as ProgressCallback
        });

        let started = Instant::now();
        let results = tokio::select! {
            results = checker.check_all_with_progress(targets, callback) => results,
            _ = tokio::signal::ctrl_c() => {
                if *progress {
                    eprintln!();
                }
                warn!("收到中断信号，已取消未完成的探测");
                return Err(UrlVitalsError::Other(anyhow::anyhow!("检测被中断")));
            }
        };
        if *progress && !results.is_empty() {
            eprintln!();
        }

        let summary = BatchSummary::from_results(&results);
        self.logging
            .batch_summary_log("cli", &summary, started.elapsed());

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
            OutputFormat::Text => print!("{}", render_text(&results, &summary)),
        }

        Ok(())
    }
}

/// 读取URL列表文件，`-` 表示标准输入
pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        buffer
    } else {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            UrlVitalsError::Other(anyhow::anyhow!("读取URL文件 {} 失败: {}", path.display(), e))
        })?
    };

    Ok(parse_url_lines(&content))
}

/// 解析URL列表：每行一个，跳过空行和 `#` 开头的注释
pub fn parse_url_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// 渲染文本格式的结果表格和汇总
pub fn render_text(results: &[CheckResult], summary: &BatchSummary) -> String {
    let mut out = String::new();

    if results.is_empty() {
        out.push_str("没有需要检测的URL\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<2} {:<11} {:<6} {:>10}  {:<40} {}",
        "", "状态", "状态码", "耗时", "URL", "详情"
    );
    let _ = writeln!(out, "{}", "-".repeat(96));

    for result in results {
        let icon = if result.status.is_reachable() { "✓" } else { "✗" };
        let status_code = result
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let latency = result
            .latency_ms
            .map(|ms| format!("{ms:.2}ms"))
            .unwrap_or_else(|| "N/A".to_string());
        let detail = match (&result.error, &result.final_url) {
            (Some(error), _) => error.clone(),
            (None, Some(final_url)) => format!("-> {final_url}"),
            (None, None) => String::new(),
        };

        let _ = writeln!(
            out,
            "{:<2} {:<11} {:<6} {:>10}  {:<40} {}",
            icon,
            result.status.to_string(),
            status_code,
            latency,
            result.original_url,
            detail
        );
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "共 {} 个URL: {} Live, {} LikelyLive, {} Down, {} Error",
        summary.total, summary.live, summary.likely_live, summary.down, summary.error
    );
    if let Some(avg) = summary.average_latency_ms {
        let _ = write!(out, "，平均耗时 {avg:.2}ms");
    }
    out.push('\n');

    out
}

/// 服务命令
pub struct ServeCommand {
    /// 已加载的配置
    config: Config,
    /// 日志系统
    logging: Arc<LoggingSystem>,
}

impl ServeCommand {
    /// 创建服务命令
    pub fn new(config: Config, logging: Arc<LoggingSystem>) -> Self {
        Self { config, logging }
    }
}

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Serve { bind, port } = &args.command else {
            return Ok(());
        };

        let mut web_config = self.config.web.clone();
        if let Some(bind) = bind {
            web_config.bind_address = bind.clone();
        }
        if let Some(port) = port {
            web_config.port = *port;
        }

        let checker = Arc::new(BatchChecker::new(&self.config.checker)?);
        info!(
            "启动HTTP检测服务，地址: {}:{}，并发数: {}，探测超时: {}ms",
            web_config.bind_address,
            web_config.port,
            checker.concurrency(),
            checker.timeout().as_millis()
        );

        let state = WebAppState::new(
            checker,
            web_config.max_batch_size,
            Arc::clone(&self.logging),
        );

        WebServer::new(web_config, state)
            .start(shutdown_signal())
            .await
    }
}

/// 等待Ctrl+C信号
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到中断信号，正在停止服务..."),
        Err(err) => warn!("监听中断信号失败: {}", err),
    }
}
