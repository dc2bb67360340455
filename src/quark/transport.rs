//! HTTP 传输层
//!
//! 探测逻辑只依赖 [`Transport`]，生产环境使用 reqwest，测试里可以换成脚本化的实现。

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::candidates::HttpMethod;
use crate::config::Config;

/// 一次候选请求（模板已渲染）
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub label: String,
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// 仅 POST 使用
    pub body: Option<Map<String, Value>>,
    pub timeout: Duration,
}

impl ProbeRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("请求超时")]
    Timeout,

    #[error("网络错误: {0}")]
    Network(String),

    #[error("读取响应失败: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportFailure::Timeout
        } else if e.is_body() || e.is_decode() {
            TransportFailure::Body(e.to_string())
        } else {
            TransportFailure::Network(e.to_string())
        }
    }
}

/// 按字节截断日志内容，不切断 UTF-8 字符
pub(crate) fn preview(text: &str, max: usize) -> &str {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ProbeRequest) -> Result<RawResponse, TransportFailure>;
}

/// 基于 reqwest 的传输实现
///
/// 不使用 cookie jar：凭证随每次请求显式携带，客户端本身不保存会话状态。
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(Config::browser_ua())
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.attempt_timeout())
    }

    /// 使用调用方构建的客户端（代理、连接池等）
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ProbeRequest) -> Result<RawResponse, TransportFailure> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        builder = builder.query(&request.query).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let (HttpMethod::Post, Some(body)) = (request.method, &request.body) {
            builder = builder.json(body);
        }

        debug!("📡 [{}] {:?} {}", request.label, request.method, request.url);

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        debug!(
            "📨 [{}] 响应 (status={}): {}",
            request.label,
            status,
            preview(&body, 300)
        );

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundary() {
        let text = "夸克网盘";
        assert_eq!(preview(text, 4), "夸");
        assert_eq!(preview(text, 100), text);
        assert_eq!(preview("abc", 2), "ab");
    }
}
