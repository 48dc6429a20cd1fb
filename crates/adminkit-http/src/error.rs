//! Request error taxonomy

use serde::Serialize;
use thiserror::Error;

pub const NETWORK_MESSAGE: &str = "网络连接失败，请检查网络";
pub const PARSE_MESSAGE: &str = "响应数据格式错误";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// No response was received
    Network,
    /// HTTP 401; the session has been invalidated
    Unauthorized,
    /// Any other non-2xx status
    Http,
    /// 2xx with a body that does not match the expected shape
    Parse,
    /// Bad input caught before anything was sent
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Http => "http",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    /// User-facing message
    pub message: String,
    pub status: Option<u16>,
    /// Underlying cause, for logs only
    pub detail: Option<String>,
}

impl RequestError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: NETWORK_MESSAGE.to_string(),
            status: None,
            detail: Some(detail.into()),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            message: status_message(401),
            status: Some(401),
            detail: None,
        }
    }

    pub fn http(status: u16) -> Self {
        Self {
            kind: ErrorKind::Http,
            message: status_message(status),
            status: Some(status),
            detail: None,
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: PARSE_MESSAGE.to_string(),
            status: None,
            detail: Some(detail.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            status: None,
            detail: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

/// Fixed message for a non-2xx status
pub fn status_message(status: u16) -> String {
    match status {
        400 => "请求参数错误".to_string(),
        401 => "未授权，请重新登录".to_string(),
        403 => "拒绝访问".to_string(),
        404 => "请求资源不存在".to_string(),
        500 => "服务器内部错误".to_string(),
        502 => "网关错误".to_string(),
        503 => "服务不可用".to_string(),
        504 => "网关超时".to_string(),
        _ => format!("请求失败 ({})", status),
    }
}
