//! 日志系统模块
//!
//! 提供结构化日志配置和管理功能。日志统一写入标准错误，
//! 标准输出留给检测结果。

use crate::checker::BatchSummary;
use crate::config::GlobalConfig;
use log::LevelFilter;
use serde_json::json;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化结果
    init_result: Result<(), String>,
}

impl Default for GlobalLoggingState {
    fn default() -> Self {
        Self {
            initialized: false,
            init_result: Ok(()),
        }
    }
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径，设置后不再输出到标准错误
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 根据配置文件的全局配置创建，无法识别的级别回退到 info
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            level: global.log_level.parse().unwrap_or(LevelFilter::Info),
            file_path: global.log_file.clone(),
            json_format: global.json_logs,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 创建新的日志系统
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 初始化日志系统
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    ///
    /// 重复调用不会重复安装订阅器，只返回新的 `LoggingSystem` 实例。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));
        let mut state = state_mutex
            .lock()
            .map_err(|e| anyhow::anyhow!("日志状态锁已损坏: {}", e))?;

        if state.initialized {
            return match &state.init_result {
                Ok(()) => Ok(Self::new(config)),
                Err(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
            };
        }

        let init_result = Self::perform_initialization(&config);
        state.initialized = true;
        state.init_result = init_result.as_ref().map(|_| ()).map_err(|e| e.to_string());

        init_result?;
        Ok(Self::new(config))
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // log crate 到 tracing 的桥接
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)?;
        Ok(())
    }

    /// 初始化 LogTracer
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        let output_layer = match &config.file_path {
            Some(file_path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| {
                        anyhow::anyhow!("打开日志文件失败 {}: {}", file_path.display(), e)
                    })?;
                let layer = fmt::layer()
                    .with_writer(file)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_target(true);
                if config.json_format {
                    layer.json().boxed()
                } else {
                    layer.boxed()
                }
            }
            None => {
                let layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_target(true);
                if config.json_format {
                    layer.json().boxed()
                } else {
                    layer.with_ansi(true).boxed()
                }
            }
        };

        match registry().with(env_filter).with(output_layer).try_init() {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> Directive {
        use tracing_subscriber::filter::LevelFilter as TracingLevel;
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = state_mutex.lock().unwrap();
            state.initialized = false;
            state.init_result = Ok(());
        }
    }

    /// 当前配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 记录批次汇总日志
    ///
    /// # 参数
    /// * `source` - 批次来源（cli / http）
    /// * `summary` - 批次统计
    /// * `elapsed` - 批次总耗时
    pub fn batch_summary_log(&self, source: &str, summary: &BatchSummary, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;

        if self.config.json_format {
            let entry = json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "batch",
                "source": source,
                "summary": summary,
                "elapsed_ms": elapsed_ms,
            });
            tracing::info!("{entry}");
        } else {
            tracing::info!(
                "BATCH: {} - {} 个URL, {} 可达, {} 不可达, {} 错误 ({}ms)",
                source,
                summary.total,
                summary.reachable(),
                summary.down,
                summary.error,
                elapsed_ms
            );
        }
    }
}
