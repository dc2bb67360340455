//! 响应分类
//!
//! 探测循环是否继续，只看这里给出的分类。

use serde_json::Value;

use super::candidates::CandidateTable;
use super::normalize::lookup;
use super::transport::{preview, RawResponse, TransportFailure};

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// HTTP 200 且业务码为成功码（或没有业务码字段）
    Success(Value),
    /// 需要提取码/额外验证，换接口也不会改变结果；status 为实际 HTTP 状态，可能非 200
    VerificationRequired {
        status: u16,
        code: i64,
        message: String,
    },
    /// HTTP 200，业务码非成功
    BusinessError {
        status: u16,
        code: i64,
        message: String,
    },
    HttpError { status: u16, message: String },
    /// 网络错误、超时、非 JSON 响应
    TransportError { reason: String },
}

impl Classification {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Classification::VerificationRequired { .. })
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Classification::VerificationRequired { status, .. }
            | Classification::BusinessError { status, .. }
            | Classification::HttpError { status, .. } => Some(*status),
            // 只有 HTTP 200 才会被判为成功
            Classification::Success(_) => Some(200),
            Classification::TransportError { .. } => None,
        }
    }

    /// 写入尝试日志的描述
    pub fn describe(&self) -> String {
        match self {
            Classification::Success(_) => "成功".to_string(),
            Classification::VerificationRequired { code, message, .. } => {
                format!("需要验证 (code={}, message={})", code, message)
            }
            Classification::BusinessError { code, message, .. } => {
                format!("业务错误 (code={}, message={})", code, message)
            }
            Classification::HttpError { status, message } => {
                format!("HTTP {} ({})", status, message)
            }
            Classification::TransportError { reason } => format!("传输错误: {}", reason),
        }
    }
}

/// 业务码可能是数字，也可能是数字字符串
pub fn business_code(body: &Value, table: &CandidateTable) -> Option<i64> {
    table
        .code_aliases
        .iter()
        .filter_map(|alias| lookup(body, alias))
        .find_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

pub fn business_message(body: &Value, table: &CandidateTable) -> String {
    table
        .message_aliases
        .iter()
        .filter_map(|alias| lookup(body, alias))
        .find_map(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn snippet(text: &str) -> String {
    preview(text, 200).to_string()
}

pub fn classify(
    outcome: Result<RawResponse, TransportFailure>,
    table: &CandidateTable,
) -> Classification {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(failure) => {
            return Classification::TransportError {
                reason: failure.to_string(),
            }
        }
    };

    let parsed: Option<Value> = serde_json::from_str(&resp.body).ok();
    let code = parsed.as_ref().and_then(|body| business_code(body, table));

    // 验证码类错误即使伴随非 200 状态也按致命处理
    if let (Some(code), Some(body)) = (code, parsed.as_ref()) {
        if table.is_verification_code(code) {
            return Classification::VerificationRequired {
                status: resp.status,
                code,
                message: business_message(body, table),
            };
        }
    }

    if resp.status != 200 {
        let message = match parsed.as_ref() {
            Some(body) if !business_message(body, table).is_empty() => {
                business_message(body, table)
            }
            _ => snippet(&resp.body),
        };
        return Classification::HttpError {
            status: resp.status,
            message,
        };
    }

    let body = match parsed {
        Some(body) if body.is_object() => body,
        Some(_) => {
            return Classification::TransportError {
                reason: "响应不是 JSON 对象".to_string(),
            }
        }
        None => {
            return Classification::TransportError {
                reason: format!("响应不是 JSON: {}", snippet(&resp.body)),
            }
        }
    };

    match code {
        Some(code) if code != table.success_code => Classification::BusinessError {
            status: resp.status,
            code,
            message: business_message(&body, table),
        },
        _ => Classification::Success(body),
    }
}
