//! 候选接口探测
//!
//! 按表顺序逐个请求：第一个成功的候选生效；遇到“需要验证”立即停止；
//! 其余失败记入尝试日志后继续下一个。

use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::candidates::{CandidateEntry, CandidateTable, HttpMethod, TemplateVars};
use super::classify::{classify, Classification};
use super::error::{Attempt, ErrorKind, ResolutionError};
use super::normalize::Malformed;
use super::transport::{preview, ProbeRequest, Transport, TransportFailure};
use super::types::{Credential, Operation};

/// 归一化结果：Empty 表示请求成功但没有需要的数据，继续尝试下一个候选
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Found(T),
    Empty,
}

/// 探测结果，附带失败尝试的日志
#[derive(Debug, Clone, PartialEq)]
pub struct Probed<T> {
    /// None：至少一个候选成功但都没有返回数据
    pub value: Option<T>,
    /// 生效的候选
    pub candidate: Option<String>,
    pub attempts: Vec<Attempt>,
}

/// 尝试日志里保留的响应体长度
const RESPONSE_PREVIEW_CHARS: usize = 300;

pub struct EndpointProbe<'a> {
    table: &'a CandidateTable,
    transport: &'a dyn Transport,
    timeout: Duration,
}

impl<'a> EndpointProbe<'a> {
    pub fn new(table: &'a CandidateTable, transport: &'a dyn Transport, timeout: Duration) -> Self {
        Self {
            table,
            transport,
            timeout,
        }
    }

    fn build_request(
        &self,
        entry: &CandidateEntry,
        vars: &TemplateVars,
        credential: &Credential,
    ) -> ProbeRequest {
        let vars = vars.clone().set("credential", credential.as_str());
        let site = &self.table.site;

        let headers = vec![
            ("Accept".to_string(), site.accept.clone()),
            ("Origin".to_string(), site.origin.clone()),
            ("Referer".to_string(), site.referer.clone()),
            ("User-Agent".to_string(), site.user_agent.clone()),
            ("Cookie".to_string(), credential.as_str().to_string()),
        ];

        ProbeRequest {
            label: entry.label.clone(),
            method: entry.method,
            url: entry.endpoint.clone(),
            query: entry.render_query(&vars),
            headers,
            body: match entry.method {
                HttpMethod::Post => Some(entry.render_payload(&vars)),
                HttpMethod::Get => None,
            },
            timeout: self.timeout,
        }
    }

    pub async fn probe<T, F>(
        &self,
        operation: Operation,
        vars: &TemplateVars,
        credential: &Credential,
        cancel: &CancellationToken,
        mut normalize: F,
    ) -> Result<Probed<T>, ResolutionError>
    where
        F: FnMut(&Value, &CandidateEntry) -> Result<Normalized<T>, Malformed>,
    {
        let entries = self.table.entries(operation);
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut saw_empty = false;

        for (i, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("🛑 {} 已取消 (已尝试 {} 个候选)", operation, i);
                return Err(ResolutionError::with_attempts(ErrorKind::Cancelled, attempts));
            }

            let request = self.build_request(entry, vars, credential);
            debug!(
                "🔎 {} [{}/{}] {}",
                operation,
                i + 1,
                entries.len(),
                entry.label
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 {} 已取消: [{}] 请求中断", operation, entry.label);
                    return Err(ResolutionError::with_attempts(ErrorKind::Cancelled, attempts));
                }
                outcome = tokio::time::timeout(self.timeout, self.transport.execute(request)) => {
                    outcome.unwrap_or(Err(TransportFailure::Timeout))
                }
            };

            let response_preview = outcome
                .as_ref()
                .ok()
                .map(|resp| preview(&resp.body, RESPONSE_PREVIEW_CHARS).to_string());
            let classification = classify(outcome, self.table);
            let http_status = classification.http_status();
            let attempt = |message: String| Attempt {
                candidate: entry.label.clone(),
                http_status,
                message,
                response_preview: response_preview.clone(),
            };

            match classification {
                Classification::Success(body) => match normalize(&body, entry) {
                    Ok(Normalized::Found(value)) => {
                        info!("✅ {} 成功: [{}]", operation, entry.label);
                        return Ok(Probed {
                            value: Some(value),
                            candidate: Some(entry.label.clone()),
                            attempts,
                        });
                    }
                    Ok(Normalized::Empty) => {
                        warn!("⚠️ {} [{}] 成功但未返回数据", operation, entry.label);
                        saw_empty = true;
                        attempts.push(attempt("成功但未返回数据".to_string()));
                    }
                    Err(malformed) => {
                        warn!("❌ {} [{}] {}", operation, entry.label, malformed);
                        attempts.push(attempt(malformed.to_string()));
                        return Err(ResolutionError::with_attempts(
                            ErrorKind::MalformedResponse,
                            attempts,
                        ));
                    }
                },
                fatal if fatal.is_fatal() => {
                    warn!("🔐 {} [{}] {}", operation, entry.label, fatal.describe());
                    attempts.push(attempt(fatal.describe()));
                    return Err(ResolutionError::with_attempts(
                        ErrorKind::VerificationRequired,
                        attempts,
                    ));
                }
                failed => {
                    warn!("⚠️ {} [{}] {}", operation, entry.label, failed.describe());
                    attempts.push(attempt(failed.describe()));
                }
            }
        }

        if saw_empty {
            return Ok(Probed {
                value: None,
                candidate: None,
                attempts,
            });
        }

        warn!("❌ {} 全部 {} 个候选均失败", operation, entries.len());
        Err(ResolutionError::with_attempts(
            ErrorKind::AllEndpointsExhausted,
            attempts,
        ))
    }
}
