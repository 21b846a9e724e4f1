//! Web 路由处理函数

use super::{ApiError, CheckRequest, HealthResponse, WebAppState};
use crate::checker::{BatchSummary, CheckResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::time::Instant;
use tracing::warn;

/// 批量检测处理函数
///
/// 结果与请求中的URL一一对应且顺序相同。
pub async fn check_urls(
    State(state): State<WebAppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<Vec<CheckResult>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("无效的检测请求: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    let urls = request.urls.unwrap_or_default();
    if urls.len() > state.max_batch_size {
        warn!(
            count = urls.len(),
            limit = state.max_batch_size,
            "检测请求超过批次上限"
        );
        return Err(ApiError::batch_too_large(urls.len(), state.max_batch_size));
    }

    let started = Instant::now();
    let results = state.checker.check_all(urls).await;
    let summary = BatchSummary::from_results(&results);
    state
        .logging
        .batch_summary_log("http", &summary, started.elapsed());

    Ok(Json(results))
}

/// 健康检查处理函数
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}
