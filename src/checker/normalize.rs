//! URL规范化
//!
//! 为没有协议的输入补上 `http://`。规范化从不失败：格式错误的字符串
//! 原样交给网络层，由探测失败产生 `Error` 结果。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 补全协议时使用的默认前缀
pub const DEFAULT_SCHEME_PREFIX: &str = "http://";

/// RFC 3986 scheme 语法: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
static SCHEME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("Invalid URL scheme regex")
});

/// 规范化后的URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    /// 原始输入
    pub original: String,
    /// 实际用于探测的URL，总是带有协议
    pub resolved: String,
}

/// 判断输入是否已经带有URI协议
///
/// `localhost:8080`、`example.com:443/path` 这类"主机:端口"形式不视为协议。
pub fn has_scheme(raw: &str) -> bool {
    let Some(found) = SCHEME_PATTERN.find(raw) else {
        return false;
    };

    let rest = &raw[found.end()..];
    let port_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let port = &rest[..port_end];

    port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit())
}

/// 规范化单个URL
///
/// 纯函数，没有失败路径。对已经带协议的URL再次规范化不会产生变化。
/// 开头的空白和C0控制字符在识别协议前去掉，`original` 保持原样。
pub fn normalize(raw: &str) -> NormalizedUrl {
    let trimmed = raw.trim_start_matches(|c: char| c <= ' ');
    let resolved = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{trimmed}")
    };

    NormalizedUrl {
        original: raw.to_string(),
        resolved,
    }
}
