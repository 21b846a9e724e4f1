//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 默认User-Agent，模拟常见浏览器以避免被简单的反爬策略拦截
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 全局配置项
    pub global: GlobalConfig,
    /// 批量检测配置
    pub checker: CheckerConfig,
    /// Web 服务器配置
    pub web: WebConfig,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否输出JSON格式日志
    #[serde(default)]
    pub json_logs: bool,
    /// 日志文件路径，设置后日志写入该文件而不是标准错误
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            log_file: None,
        }
    }
}

/// 探测使用的HTTP方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// GET请求，只读取状态行和响应头，不读取响应体
    #[default]
    Get,
    /// HEAD请求，部分服务器不支持
    Head,
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMethod::Get => write!(f, "GET"),
            ProbeMethod::Head => write!(f, "HEAD"),
        }
    }
}

/// 批量检测配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    /// 最大并发探测数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 单次探测超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 建立连接的超时时间（毫秒），未设置时只受 `timeout_ms` 约束
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    /// 探测方法
    #[serde(default)]
    pub method: ProbeMethod,
    /// 请求使用的User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// 是否跟随重定向
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
    /// 最大重定向次数
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// 额外的请求头
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: None,
            method: ProbeMethod::default(),
            user_agent: default_user_agent(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            headers: default_headers(),
        }
    }
}

impl CheckerConfig {
    /// 单次探测的超时时间
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 连接超时时间
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// Web 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 是否启用CORS
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
    /// 单次请求允许的最大URL数量
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_web_port(),
            cors_enabled: default_cors_enabled(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl WebConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("无效的监听地址 {}:{}: {}", self.bind_address, self.port, e))
    }
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_concurrency() -> usize {
    20
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_follow_redirects() -> bool {
    true
}
fn default_max_redirects() -> usize {
    10
}
fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
    ])
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    5000
}
fn default_cors_enabled() -> bool {
    true
}
fn default_max_batch_size() -> usize {
    10_000
}

/// 验证批量检测配置
///
/// 这些条件在任何探测开始之前检查，`BatchChecker` 构建时也会调用。
pub fn validate_checker_config(checker: &CheckerConfig) -> Result<(), String> {
    if checker.concurrency == 0 {
        return Err("并发数必须大于0".to_string());
    }

    if checker.timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if checker.connect_timeout_ms == Some(0) {
        return Err("连接超时时间不能为0".to_string());
    }

    if checker.user_agent.trim().is_empty() {
        return Err("User-Agent不能为空".to_string());
    }

    for name in checker.headers.keys() {
        if name.trim().is_empty() {
            return Err("请求头名称不能为空".to_string());
        }
    }

    Ok(())
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    validate_checker_config(&config.checker)?;

    // 验证Web配置
    if config.web.port == 0 {
        return Err("Web服务器端口不能为0".to_string());
    }

    if config.web.bind_address.trim().is_empty() {
        return Err("Web服务器绑定地址不能为空".to_string());
    }

    config.web.socket_addr()?;

    if config.web.max_batch_size == 0 {
        return Err("单次请求的最大URL数量不能为0".to_string());
    }

    Ok(())
}
