//! Web服务器实现
//!
//! 基于axum提供HTTP服务器和路由管理

use super::{handlers, WebAppState};
use crate::config::WebConfig;
use crate::error::{Result, UrlVitalsError};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// 创建路由
///
/// # 参数
/// * `state` - Web应用状态
/// * `cors_enabled` - 是否允许跨域请求
pub fn create_router(state: WebAppState, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/check", post(handlers::check_urls))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
    } else {
        router
    }
}

/// Web服务器
pub struct WebServer {
    /// 配置
    config: WebConfig,
    /// 应用状态
    state: WebAppState,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(config: WebConfig, state: WebAppState) -> Self {
        Self { config, state }
    }

    /// 绑定配置中的地址并启动服务器，直到 `shutdown` 完成
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| UrlVitalsError::Other(anyhow::anyhow!(e)))?;

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// 在已绑定的监听器上运行服务器
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        let app = create_router(self.state, self.config.cors_enabled);

        info!("Web服务器已启动: http://{}", local_addr);
        info!("检测接口: POST http://{}/check", local_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{
        BatchChecker, CheckResult, FailureKind, LivenessStatus, ProbeFailure, ProbeResponse,
        Prober,
    };
    use crate::config::CheckerConfig;
    use crate::logging::{LogConfig, LoggingSystem};
    use crate::web::{ApiError, HealthResponse};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// 根据URL中的路径返回状态码的探测器，例如 `http://a/404`
    struct PathStatusProber;

    #[async_trait]
    impl Prober for PathStatusProber {
        async fn probe(&self, url: &str) -> std::result::Result<ProbeResponse, ProbeFailure> {
            match url.rsplit('/').next().and_then(|s| s.parse::<u16>().ok()) {
                Some(code) => Ok(ProbeResponse::new(code)),
                None => Err(ProbeFailure::new(FailureKind::Dns, "DNS resolution failed")),
            }
        }
    }

    fn test_state(checker: BatchChecker, max_batch_size: usize) -> WebAppState {
        let logging = Arc::new(LoggingSystem::new(LogConfig::default()));
        WebAppState::new(Arc::new(checker), max_batch_size, logging)
    }

    fn test_router(max_batch_size: usize) -> Router {
        let checker =
            BatchChecker::with_prober(&CheckerConfig::default(), Arc::new(PathStatusProber))
                .unwrap();
        create_router(test_state(checker, max_batch_size), true)
    }

    fn post_check(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/check")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    /// 把日志写入共享缓冲区
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_check_logs_single_batch_summary() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = test_router(100)
            .oneshot(post_check(r#"{"urls": ["a.test/200", "b.test/404"]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let output = logs.text();
        assert_eq!(output.matches("BATCH:").count(), 1, "{output}");
        assert!(output.contains("BATCH: http - 2 个URL"), "{output}");
    }

    #[tokio::test]
    async fn test_check_preserves_order() {
        let response = test_router(100)
            .oneshot(post_check(
                r#"{"urls": ["a.test/500", "b.test/200", "unresolvable", "c.test/403"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let results: Vec<CheckResult> = serde_json::from_slice(&body_bytes(response).await).unwrap();

        let originals: Vec<_> = results.iter().map(|r| r.original_url.as_str()).collect();
        assert_eq!(originals, vec!["a.test/500", "b.test/200", "unresolvable", "c.test/403"]);

        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                LivenessStatus::Down,
                LivenessStatus::Live,
                LivenessStatus::Error,
                LivenessStatus::LikelyLive,
            ]
        );
    }

    #[tokio::test]
    async fn test_check_missing_or_empty_urls() {
        for body in ["{}", r#"{"urls": null}"#, r#"{"urls": []}"#] {
            let response = test_router(100).oneshot(post_check(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "请求体: {body}");
            assert_eq!(body_bytes(response).await, b"[]");
        }
    }

    #[tokio::test]
    async fn test_check_malformed_body() {
        let response = test_router(100)
            .oneshot(post_check("{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, 400);
        assert!(!error.error.is_empty());

        let response = test_router(100)
            .oneshot(post_check(r#"{"urls": "a.test"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, 422);
    }

    #[tokio::test]
    async fn test_check_requires_json_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/check")
            .body(Body::from(r#"{"urls": []}"#))
            .unwrap();

        let response = test_router(100).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, 415);
    }

    #[tokio::test]
    async fn test_check_batch_too_large() {
        let response = test_router(2)
            .oneshot(post_check(r#"{"urls": ["a/200", "b/200", "c/200"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, 413);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = test_router(1).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, crate::VERSION);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/check")
            .header("origin", "http://localhost:8501")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = test_router(1).oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_server_graceful_shutdown() {
        let checker =
            BatchChecker::with_prober(&CheckerConfig::default(), Arc::new(PathStatusProber))
                .unwrap();
        let server = WebServer::new(WebConfig::default(), test_state(checker, 10));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
