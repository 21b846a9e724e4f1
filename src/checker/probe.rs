//! HTTP探测器实现
//!
//! 定义探测接口以及基于reqwest的默认实现。探测器只负责发出一次请求并
//! 返回响应或失败原因，截止时间、计时和分类由批量检测器负责。

use crate::checker::result::FailureKind;
use crate::config::{CheckerConfig, ProbeMethod};
use crate::error::CheckError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Url};
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// 收到的HTTP响应摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// 最终响应的状态码（重定向之后）
    pub status_code: u16,
    /// 发生重定向时的最终URL
    pub final_url: Option<String>,
}

impl ProbeResponse {
    /// 创建没有重定向的响应
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            final_url: None,
        }
    }
}

/// 探测失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProbeFailure {
    /// 失败类型
    pub kind: FailureKind,
    /// 可读的失败描述
    pub message: String,
}

impl ProbeFailure {
    /// 创建探测失败
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 探测器trait，定义单次探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对一个已规范化的URL发出一次请求
    ///
    /// # 参数
    /// * `url` - 带协议的URL
    ///
    /// # 返回
    /// * `Result<ProbeResponse, ProbeFailure>` - 响应摘要或失败原因
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeFailure>;
}

/// 基于reqwest的HTTP探测器
///
/// 内部的 `Client` 在所有探测之间共享，复用连接池。
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 探测方法
    method: ProbeMethod,
}

impl HttpProber {
    /// 根据检测配置创建HTTP探测器
    ///
    /// # 参数
    /// * `config` - 检测配置
    ///
    /// # 返回
    /// * `Result<Self, CheckError>` - 探测器实例，请求头无效时返回错误
    pub fn new(config: &CheckerConfig) -> Result<Self, CheckError> {
        let headers = build_header_map(config)?;

        let redirect_policy = if config.follow_redirects {
            redirect::Policy::limited(config.max_redirects)
        } else {
            redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect_policy);

        if let Some(connect_timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            method: config.method,
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeFailure> {
        let request = match self.method {
            ProbeMethod::Get => self.client.get(url),
            ProbeMethod::Head => self.client.head(url),
        };

        // 只等待状态行和响应头，响应体随 `response` 一起丢弃
        let response = request.send().await.map_err(|e| classify_request_error(&e))?;

        let requested = Url::parse(url).ok();
        let final_url = (requested.as_ref() != Some(response.url())).then(|| response.url().to_string());

        Ok(ProbeResponse {
            status_code: response.status().as_u16(),
            final_url,
        })
    }
}

fn build_header_map(config: &CheckerConfig) -> Result<HeaderMap, CheckError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CheckError::InvalidConfig(format!("无效的请求头名称: {name}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| CheckError::InvalidConfig(format!("请求头 {name} 的值无效")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// 将reqwest错误映射为失败类型和可读描述
///
/// 顶层的 `reqwest::Error` 会在描述中带上请求URL，只匹配它的下层错误，
/// 否则URL中的文字会影响分类。DNS和TLS只在建立连接阶段出现。
pub fn classify_request_error(error: &reqwest::Error) -> ProbeFailure {
    if error.is_timeout() {
        return ProbeFailure::new(FailureKind::Timeout, "Request timed out");
    }

    if error.is_redirect() {
        return ProbeFailure::new(FailureKind::Redirect, "Too many redirects");
    }

    if error.is_builder() {
        return ProbeFailure::new(
            FailureKind::InvalidUrl,
            format!("Invalid URL: {}", root_cause(error)),
        );
    }

    let causes: Vec<&(dyn StdError + 'static)> = match error.source() {
        Some(source) => error_chain(source).collect(),
        None => Vec::new(),
    };
    let io_kinds: Vec<io::ErrorKind> = causes
        .iter()
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .map(io::Error::kind)
        .collect();
    let cause_text = causes
        .iter()
        .map(|e| e.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join(": ");

    if io_kinds.contains(&io::ErrorKind::ConnectionRefused)
        || cause_text.contains("connection refused")
    {
        return ProbeFailure::new(FailureKind::ConnectionRefused, "Connection refused");
    }

    if !error.is_connect() {
        return ProbeFailure::new(
            FailureKind::Other,
            format!("Request failed: {}", root_cause(error)),
        );
    }

    if cause_text.contains("dns error")
        || cause_text.contains("failed to lookup address")
        || cause_text.contains("name or service not known")
        || cause_text.contains("no such host")
    {
        ProbeFailure::new(
            FailureKind::Dns,
            format!("DNS resolution failed: {}", root_cause(error)),
        )
    } else if io_kinds.contains(&io::ErrorKind::InvalidData)
        || cause_text.contains("certificate")
        || cause_text.contains("tls")
        || cause_text.contains("ssl")
        || cause_text.contains("handshake")
    {
        // rustls的握手错误以 InvalidData 的io错误返回
        ProbeFailure::new(
            FailureKind::Tls,
            format!("SSL/TLS error: {}", root_cause(error)),
        )
    } else {
        ProbeFailure::new(
            FailureKind::Other,
            format!("Connection failed: {}", root_cause(error)),
        )
    }
}

fn error_chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(error), |&e| e.source())
}

fn root_cause(error: &(dyn StdError + 'static)) -> String {
    error_chain(error)
        .last()
        .map(|e| e.to_string())
        .unwrap_or_default()
}
