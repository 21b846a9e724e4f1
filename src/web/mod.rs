//! Web API模块
//!
//! 提供批量检测的HTTP接口

use crate::checker::BatchChecker;
use crate::logging::LoggingSystem;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod handlers;
pub mod server;

pub use server::{create_router, WebServer};

/// Web应用共享状态
#[derive(Debug, Clone)]
pub struct WebAppState {
    /// 批量检测器，所有请求共享同一个HTTP连接池
    pub checker: Arc<BatchChecker>,
    /// 单次请求允许的最大URL数量
    pub max_batch_size: usize,
    /// 日志系统，用于记录批次汇总
    pub logging: Arc<LoggingSystem>,
}

impl WebAppState {
    /// 创建新的Web应用状态
    pub fn new(
        checker: Arc<BatchChecker>,
        max_batch_size: usize,
        logging: Arc<LoggingSystem>,
    ) -> Self {
        Self {
            checker,
            max_batch_size,
            logging,
        }
    }
}

/// `POST /check` 请求体
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckRequest {
    /// 待检测的URL列表，缺失或为null时视为空列表
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
}

/// API错误响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// 错误消息
    pub error: String,
    /// HTTP状态码
    pub code: u16,
}

impl ApiError {
    /// 创建新的API错误
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }

    /// 批次超过上限
    pub fn batch_too_large(count: usize, limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Too many URLs: {count} submitted, at most {limit} allowed"),
        )
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
