//! 检测结果数据结构
//!
//! 定义存活状态、失败类型、单个URL的检测结果以及批次统计

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 存活状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LivenessStatus {
    /// 收到状态码小于400的响应
    Live,
    /// 收到403或429，通常是反爬中间件拦截了一个正常运行的服务
    LikelyLive,
    /// 收到其他4xx/5xx响应
    Down,
    /// 没有收到响应
    Error,
}

impl std::fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessStatus::Live => write!(f, "Live"),
            LivenessStatus::LikelyLive => write!(f, "LikelyLive"),
            LivenessStatus::Down => write!(f, "Down"),
            LivenessStatus::Error => write!(f, "Error"),
        }
    }
}

impl LivenessStatus {
    /// 根据最终响应的状态码分类
    pub fn from_status_code(status_code: u16) -> Self {
        match status_code {
            code if code < 400 => LivenessStatus::Live,
            403 | 429 => LivenessStatus::LikelyLive,
            _ => LivenessStatus::Down,
        }
    }

    /// 是否可以认为站点仍在运行
    pub fn is_reachable(&self) -> bool {
        matches!(self, LivenessStatus::Live | LivenessStatus::LikelyLive)
    }
}

/// 探测失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 超过探测截止时间
    Timeout,
    /// 域名解析失败
    Dns,
    /// 连接被拒绝
    ConnectionRefused,
    /// TLS握手或证书错误
    Tls,
    /// 重定向次数超限
    Redirect,
    /// 网络层无法解析的URL
    InvalidUrl,
    /// 其他网络错误
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Dns => "dns",
            FailureKind::ConnectionRefused => "connection_refused",
            FailureKind::Tls => "tls",
            FailureKind::Redirect => "redirect",
            FailureKind::InvalidUrl => "invalid_url",
            FailureKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// 单个URL的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// 原始输入，原样返回
    pub original_url: String,
    /// 实际探测的URL
    pub checked_url: Option<String>,
    /// 重定向后的最终URL（仅当与 `checked_url` 不同时）
    pub final_url: Option<String>,
    /// HTTP状态码
    pub status_code: Option<u16>,
    /// 存活状态
    pub status: LivenessStatus,
    /// 探测耗时（毫秒，保留两位小数）
    pub latency_ms: Option<f64>,
    /// 错误信息
    pub error: Option<String>,
    /// 失败类型
    pub error_kind: Option<FailureKind>,
    /// 结果生成时间
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// 根据收到的响应创建结果
    pub fn from_response(
        original_url: impl Into<String>,
        checked_url: impl Into<String>,
        status_code: u16,
        latency: Duration,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            checked_url: Some(checked_url.into()),
            final_url: None,
            status_code: Some(status_code),
            status: LivenessStatus::from_status_code(status_code),
            latency_ms: Some(duration_to_ms(latency)),
            error: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    /// 根据探测失败创建结果，状态码与耗时均为空
    pub fn from_failure(
        original_url: impl Into<String>,
        checked_url: Option<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            checked_url,
            final_url: None,
            status_code: None,
            status: LivenessStatus::Error,
            latency_ms: None,
            error: Some(message.into()),
            error_kind: Some(kind),
            timestamp: Utc::now(),
        }
    }

    /// 设置重定向后的最终URL，与实际探测的URL相同时忽略
    pub fn with_final_url(mut self, final_url: Option<String>) -> Self {
        self.final_url = final_url.filter(|url| Some(url) != self.checked_url.as_ref());
        self
    }
}

/// 将耗时转换为毫秒并保留两位小数
pub fn duration_to_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// 批次统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// URL总数
    pub total: usize,
    /// Live数量
    pub live: usize,
    /// LikelyLive数量
    pub likely_live: usize,
    /// Down数量
    pub down: usize,
    /// Error数量
    pub error: usize,
    /// 平均耗时（毫秒），没有任何响应时为空
    pub average_latency_ms: Option<f64>,
}

impl BatchSummary {
    /// 从结果列表计算统计信息
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };

        let mut latency_sum = 0.0;
        let mut latency_count = 0usize;

        for result in results {
            match result.status {
                LivenessStatus::Live => summary.live += 1,
                LivenessStatus::LikelyLive => summary.likely_live += 1,
                LivenessStatus::Down => summary.down += 1,
                LivenessStatus::Error => summary.error += 1,
            }

            if let Some(latency) = result.latency_ms {
                latency_sum += latency;
                latency_count += 1;
            }
        }

        if latency_count > 0 {
            summary.average_latency_ms =
                Some(((latency_sum / latency_count as f64) * 100.0).round() / 100.0);
        }

        summary
    }

    /// 可达（Live + LikelyLive）的数量
    pub fn reachable(&self) -> usize {
        self.live + self.likely_live
    }
}
