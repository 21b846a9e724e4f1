//! 错误处理模块
//!
//! 定义应用程序的统一错误类型。单个URL的探测失败不属于这里的错误，
//! 它们总是被归类为 `Error` 状态的检测结果。

use thiserror::Error;

/// URL Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum UrlVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 检测器构建相关错误
    #[error("检测器错误: {0}")]
    Check(#[from] CheckError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 批量检测器错误类型
///
/// 只在开始探测之前出现，属于调用方的编程错误。
#[derive(Error, Debug)]
pub enum CheckError {
    /// 检测参数无效（例如并发数为0）
    #[error("检测参数无效: {0}")]
    InvalidConfig(String),

    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, UrlVitalsError>;
