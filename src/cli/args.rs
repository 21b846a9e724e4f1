//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::ProbeMethod;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// URL Vitals - 批量URL存活检测工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "url-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "配置文件路径",
        env = "URL_VITALS_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的级别
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        help = "日志级别",
        env = "URL_VITALS_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 输出JSON格式日志
    #[arg(long, global = true, help = "输出JSON格式日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 检测一批URL并输出结果
    Check {
        /// 待检测的URL
        #[arg(value_name = "URL", help = "待检测的URL")]
        urls: Vec<String>,

        /// 从文件读取URL，每行一个，`-` 表示标准输入
        #[arg(short, long, value_name = "PATH", help = "从文件读取URL（- 表示标准输入）")]
        file: Option<PathBuf>,

        /// 输出格式
        #[arg(long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,

        /// 最大并发探测数
        #[arg(
            long,
            value_name = "COUNT",
            help = "最大并发探测数",
            env = "URL_VITALS_CONCURRENCY"
        )]
        concurrency: Option<usize>,

        /// 单次探测超时时间（毫秒）
        #[arg(long, value_name = "MS", help = "单次探测超时时间（毫秒）")]
        timeout_ms: Option<u64>,

        /// 探测方法
        #[arg(long, value_enum, help = "探测方法")]
        method: Option<MethodArg>,

        /// 在标准错误输出显示进度
        #[arg(long, help = "显示检测进度")]
        progress: bool,
    },

    /// 启动HTTP检测服务
    Serve {
        /// 绑定地址
        #[arg(long, value_name = "ADDR", help = "绑定地址")]
        bind: Option<String>,

        /// 监听端口
        #[arg(short, long, value_name = "PORT", help = "监听端口")]
        port: Option<u16>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::loader::CONFIG_FILE_NAME
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 命令行中的探测方法
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum MethodArg {
    /// GET，不读取响应体
    Get,
    /// HEAD
    Head,
}

impl From<MethodArg> for ProbeMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Get => ProbeMethod::Get,
            MethodArg::Head => ProbeMethod::Head,
        }
    }
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_check_command() {
        let args = Args::try_parse_from([
            "url-vitals",
            "check",
            "example.com",
            "https://example.org",
            "--format",
            "json",
            "--concurrency",
            "5",
            "--timeout-ms",
            "2500",
            "--method",
            "head",
            "--progress",
        ])
        .unwrap();

        match args.command {
            Commands::Check {
                urls,
                file,
                format,
                concurrency,
                timeout_ms,
                method,
                progress,
            } => {
                assert_eq!(urls, vec!["example.com", "https://example.org"]);
                assert!(file.is_none());
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(concurrency, Some(5));
                assert_eq!(timeout_ms, Some(2500));
                assert_eq!(method, Some(MethodArg::Head));
                assert!(progress);
            }
            other => panic!("解析出错误的子命令: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "url-vitals",
            "serve",
            "--port",
            "8080",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.json_logs);
        assert!(matches!(
            args.command,
            Commands::Serve {
                port: Some(8080),
                bind: None
            }
        ));
    }

    #[test]
    fn test_init_default_path() {
        let args = Args::try_parse_from(["url-vitals", "init"]).unwrap();
        match args.command {
            Commands::Init { config_path, force } => {
                assert_eq!(config_path, PathBuf::from("url-vitals.toml"));
                assert!(!force);
            }
            other => panic!("解析出错误的子命令: {other:?}"),
        }
    }

    #[test]
    fn test_level_and_method_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(ProbeMethod::from(MethodArg::Head), ProbeMethod::Head);
    }
}
