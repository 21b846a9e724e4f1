//! 批量检测器
//!
//! 对一批URL做有界并发探测，每个探测有独立的截止时间，结果按输入顺序返回。
//! 所有探测都运行在 `check_all` 返回的 future 内，丢弃该 future 即取消整个批次，
//! 不会留下后台任务。

use crate::checker::normalize::normalize;
use crate::checker::probe::{HttpProber, Prober};
use crate::checker::result::{CheckResult, FailureKind};
use crate::config::{validate_checker_config, CheckerConfig};
use crate::error::CheckError;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// 进度回调函数类型，每完成一个探测调用一次，不应阻塞
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// 批次进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// 已完成数量
    pub completed: usize,
    /// 总数量
    pub total: usize,
    /// 刚完成的原始URL
    pub url: String,
}

impl BatchProgress {
    /// 完成比例，空批次视为已完成
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// 批量检测器
#[derive(Clone)]
pub struct BatchChecker {
    /// 探测器，在所有探测之间共享
    prober: Arc<dyn Prober>,
    /// 最大并发探测数
    concurrency: usize,
    /// 单次探测超时时间
    timeout: Duration,
}

impl std::fmt::Debug for BatchChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchChecker")
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BatchChecker {
    /// 使用默认的HTTP探测器创建批量检测器
    ///
    /// 配置无效（并发数为0、超时为0、请求头无效）时立即返回错误，不会发出任何请求。
    pub fn new(config: &CheckerConfig) -> Result<Self, CheckError> {
        validate_checker_config(config).map_err(CheckError::InvalidConfig)?;
        let prober = HttpProber::new(config)?;
        Self::with_prober(config, Arc::new(prober))
    }

    /// 使用自定义探测器创建批量检测器
    pub fn with_prober(config: &CheckerConfig, prober: Arc<dyn Prober>) -> Result<Self, CheckError> {
        validate_checker_config(config).map_err(CheckError::InvalidConfig)?;

        Ok(Self {
            prober,
            concurrency: config.concurrency,
            timeout: config.timeout(),
        })
    }

    /// 最大并发探测数
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 单次探测超时时间
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 检测一批URL
    ///
    /// 返回结果与输入一一对应且顺序相同；重复的URL各自独立探测。
    pub async fn check_all(&self, urls: Vec<String>) -> Vec<CheckResult> {
        self.check_all_with_progress(urls, None).await
    }

    /// 检测一批URL并报告进度
    pub async fn check_all_with_progress(
        &self,
        urls: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> Vec<CheckResult> {
        let total = urls.len();
        if total == 0 {
            debug!("空批次，跳过检测");
            return Vec::new();
        }

        let started = Instant::now();
        debug!(
            total = total,
            concurrency = self.concurrency,
            timeout_ms = self.timeout.as_millis() as u64,
            "开始批量检测"
        );

        let mut in_flight = stream::iter(urls.into_iter().enumerate())
            .map(|(index, raw)| async move { (index, self.check_one(raw).await) })
            .buffer_unordered(self.concurrency);

        // 完成顺序不确定，按输入下标写入对应的槽位
        let mut slots: Vec<Option<CheckResult>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        while let Some((index, result)) = in_flight.next().await {
            completed += 1;
            if let Some(callback) = &progress {
                callback(&BatchProgress {
                    completed,
                    total,
                    url: result.original_url.clone(),
                });
            }
            slots[index] = Some(result);
        }

        let results: Vec<CheckResult> = slots.into_iter().flatten().collect();
        debug!(
            total = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "批量检测完成"
        );

        results
    }

    /// 检测单个URL，任何失败都转换为 `Error` 结果
    pub async fn check_one(&self, raw: String) -> CheckResult {
        let normalized = normalize(&raw);
        let started = Instant::now();

        let probe = AssertUnwindSafe(self.prober.probe(&normalized.resolved)).catch_unwind();
        let outcome = timeout(self.timeout, probe).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(Ok(response))) => {
                debug!(
                    url = %normalized.resolved,
                    status_code = response.status_code,
                    latency_ms = elapsed.as_millis() as u64,
                    "探测完成"
                );
                CheckResult::from_response(
                    normalized.original,
                    normalized.resolved,
                    response.status_code,
                    elapsed,
                )
                .with_final_url(response.final_url)
            }
            Ok(Ok(Err(failure))) => {
                debug!(
                    url = %normalized.resolved,
                    kind = %failure.kind,
                    error = %failure.message,
                    "探测失败"
                );
                CheckResult::from_failure(
                    normalized.original,
                    Some(normalized.resolved),
                    failure.kind,
                    failure.message,
                )
            }
            Ok(Err(_)) => {
                warn!(url = %normalized.resolved, "探测过程中发生panic");
                CheckResult::from_failure(
                    normalized.original,
                    Some(normalized.resolved),
                    FailureKind::Other,
                    "Probe panicked",
                )
            }
            Err(_) => {
                debug!(url = %normalized.resolved, "探测超时");
                CheckResult::from_failure(
                    normalized.original,
                    Some(normalized.resolved),
                    FailureKind::Timeout,
                    format!("Request timed out after {} ms", self.timeout.as_millis()),
                )
            }
        }
    }
}
