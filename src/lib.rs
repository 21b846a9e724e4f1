//! URL Vitals - 批量URL存活检测工具
//!
//! 对一批URL做有界并发的HTTP探测，报告每个URL的存活状态、状态码和响应耗时：
//! - 自动为缺少协议的输入补全 `http://`
//! - 每个探测有独立的超时，单个失败不影响其他URL
//! - 结果顺序与输入顺序一致
//! - 提供命令行和HTTP接口

pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

// 重新导出主要类型
pub use checker::{BatchChecker, BatchSummary, CheckResult, FailureKind, LivenessStatus};
pub use config::{CheckerConfig, Config};
pub use error::UrlVitalsError;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
