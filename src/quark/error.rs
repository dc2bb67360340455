//! 解析错误类型

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// 链接格式不符合 https://pan.quark.cn/s/<id>[?pwd=<code>]
    #[error("链接格式无效")]
    InvalidLinkFormat,

    /// 提取码缺失/错误，或服务端要求额外验证
    #[error("需要验证（提取码缺失或错误）")]
    VerificationRequired,

    /// 状态成功但响应结构无法识别
    #[error("响应结构异常")]
    MalformedResponse,

    /// 所有候选接口均失败
    #[error("所有候选接口均失败")]
    AllEndpointsExhausted,

    #[error("已取消")]
    Cancelled,
}

/// 单次候选请求的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub candidate: String,
    pub http_status: Option<u16>,
    pub message: String,
    /// 响应体开头部分，传输失败时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (尝试 {} 次)", .attempts.len())]
pub struct ResolutionError {
    pub kind: ErrorKind,
    pub attempts: Vec<Attempt>,
}

impl ResolutionError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            attempts: Vec::new(),
        }
    }

    pub fn with_attempts(kind: ErrorKind, attempts: Vec<Attempt>) -> Self {
        Self { kind, attempts }
    }

    pub fn invalid_link() -> Self {
        Self::new(ErrorKind::InvalidLinkFormat)
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::VerificationRequired
    }

    /// 每次尝试一行，供日志/调试工具打印
    pub fn attempt_report(&self) -> String {
        self.attempts
            .iter()
            .enumerate()
            .map(|(i, a)| match a.http_status {
                Some(status) => format!("{}. [{}] HTTP {}: {}", i + 1, a.candidate, status, a.message),
                None => format!("{}. [{}] {}", i + 1, a.candidate, a.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_attempt_count() {
        let err = ResolutionError::with_attempts(
            ErrorKind::AllEndpointsExhausted,
            vec![Attempt {
                candidate: "share_page/dir".to_string(),
                http_status: Some(500),
                message: "HTTP 500".to_string(),
                response_preview: Some("Internal Server Error".to_string()),
            }],
        );
        assert_eq!(err.to_string(), "所有候选接口均失败 (尝试 1 次)");
        assert_eq!(err.attempt_report(), "1. [share_page/dir] HTTP 500: HTTP 500");
    }
}
