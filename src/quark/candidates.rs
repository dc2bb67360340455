//! 候选接口表
//!
//! 接口地址、请求体形状、响应字段别名全部来自配置（TOML），
//! 新发现的接口只需要改表，不需要改代码。

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::sync::OnceLock;
use url::Url;

use super::types::{Operation, ShareReference};
use crate::config::Config;

/// 内置候选表
static BUILTIN_TABLE: &str = include_str!("../../candidates/quark.toml");

/// 模板中允许出现的占位符
pub const KNOWN_PLACEHOLDERS: &[&str] = &["share_id", "passcode", "dir_fid", "fid", "credential"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

fn default_method() -> HttpMethod {
    HttpMethod::Post
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateEntry {
    pub label: String,
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    /// 固定的查询参数（平台/渠道标识等），值同样支持占位符
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub list_aliases: Vec<String>,
    #[serde(default)]
    pub url_aliases: Vec<String>,
}

/// 每个候选请求都携带的站点请求头
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteHeaders {
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SiteHeaders {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            origin: default_origin(),
            referer: default_referer(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_accept() -> String {
    "application/json, text/plain, */*".to_string()
}

fn default_origin() -> String {
    "https://pan.quark.cn".to_string()
}

fn default_referer() -> String {
    "https://pan.quark.cn/".to_string()
}

fn default_user_agent() -> String {
    Config::browser_ua().to_string()
}

/// 列表元素的字段别名，按顺序尝试
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldAliases {
    #[serde(default = "default_fid_aliases")]
    pub fid: Vec<String>,
    #[serde(default = "default_name_aliases")]
    pub name: Vec<String>,
    #[serde(default = "default_size_aliases")]
    pub size: Vec<String>,
    /// 布尔型目录标记
    #[serde(default = "default_dir_flag_aliases")]
    pub dir_flag: Vec<String>,
    /// 类型字段，值命中 folder_tokens 即为目录
    #[serde(default = "default_kind_aliases")]
    pub kind: Vec<String>,
    #[serde(default = "default_folder_tokens")]
    pub folder_tokens: Vec<String>,
    /// 列表字段缺失时，用于判断“明确为空”的数据字段
    #[serde(default = "default_data_field")]
    pub data: String,
    #[serde(default = "default_share_id_aliases")]
    pub share_id: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            fid: default_fid_aliases(),
            name: default_name_aliases(),
            size: default_size_aliases(),
            dir_flag: default_dir_flag_aliases(),
            kind: default_kind_aliases(),
            folder_tokens: default_folder_tokens(),
            data: default_data_field(),
            share_id: default_share_id_aliases(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_fid_aliases() -> Vec<String> {
    strings(&["fid", "file_id"])
}

fn default_name_aliases() -> Vec<String> {
    strings(&["file_name", "name"])
}

fn default_size_aliases() -> Vec<String> {
    strings(&["size", "file_size"])
}

fn default_dir_flag_aliases() -> Vec<String> {
    strings(&["is_dir", "dir"])
}

fn default_kind_aliases() -> Vec<String> {
    strings(&["type", "file_type"])
}

fn default_folder_tokens() -> Vec<String> {
    strings(&["folder", "dir", "directory"])
}

fn default_data_field() -> String {
    "data".to_string()
}

fn default_share_id_aliases() -> Vec<String> {
    strings(&["data.share_id", "share_id"])
}

fn default_success_code() -> i64 {
    0
}

fn default_verification_codes() -> Vec<i64> {
    vec![40005]
}

fn default_code_aliases() -> Vec<String> {
    strings(&["code", "errno"])
}

fn default_message_aliases() -> Vec<String> {
    strings(&["message", "msg", "err_msg"])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateTable {
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_success_code")]
    pub success_code: i64,
    /// 命中即判定为“需要验证”，立即停止探测
    #[serde(default = "default_verification_codes")]
    pub verification_codes: Vec<i64>,
    #[serde(default = "default_code_aliases")]
    pub code_aliases: Vec<String>,
    #[serde(default = "default_message_aliases")]
    pub message_aliases: Vec<String>,
    #[serde(default)]
    pub site: SiteHeaders,
    #[serde(default)]
    pub fields: FieldAliases,
    #[serde(default)]
    pub list_directory: Vec<CandidateEntry>,
    #[serde(default)]
    pub get_download_url: Vec<CandidateEntry>,
}

impl CandidateTable {
    /// 随程序发布的默认候选表
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLE).context("内置候选表无效")
    }

    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("读取候选表失败: {}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("候选表无效: {}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: CandidateTable = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn entries(&self, operation: Operation) -> &[CandidateEntry] {
        match operation {
            Operation::ListDirectory => &self.list_directory,
            Operation::GetDownloadUrl => &self.get_download_url,
        }
    }

    pub fn is_verification_code(&self, code: i64) -> bool {
        self.verification_codes.contains(&code)
    }

    pub fn validate(&self) -> Result<()> {
        for operation in [Operation::ListDirectory, Operation::GetDownloadUrl] {
            let entries = self.entries(operation);
            if entries.is_empty() {
                return Err(anyhow!("{} 没有任何候选接口", operation));
            }

            for entry in entries {
                let url = Url::parse(&entry.endpoint)
                    .map_err(|e| anyhow!("[{}] endpoint 无效: {} ({})", entry.label, entry.endpoint, e))?;
                if url.scheme() != "https" && url.scheme() != "http" {
                    return Err(anyhow!("[{}] endpoint 必须是 http(s)", entry.label));
                }

                let aliases = match operation {
                    Operation::ListDirectory => &entry.list_aliases,
                    Operation::GetDownloadUrl => &entry.url_aliases,
                };
                if aliases.is_empty() {
                    return Err(anyhow!("[{}] 未配置响应字段别名", entry.label));
                }

                let mut templates: Vec<String> = entry.query.values().cloned().collect();
                for value in entry.payload.values() {
                    collect_strings(value, &mut templates);
                }
                for template in &templates {
                    for name in placeholders_in(template) {
                        if !KNOWN_PLACEHOLDERS.contains(&name) {
                            return Err(anyhow!("[{}] 未知占位符: {{{}}}", entry.label, name));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn placeholder_re() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([a-z_]+)(\?)?\}").unwrap())
}

fn placeholders_in(template: &str) -> Vec<&str> {
    placeholder_re()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// 渲染模板时可用的变量
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn for_reference(reference: &ShareReference) -> Self {
        Self::default()
            .set("share_id", reference.share_id.clone())
            .set("passcode", reference.passcode.clone())
    }

    pub fn set(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// 渲染结果：None 表示该字段应省略
fn render_value(value: &Value, vars: &TemplateVars) -> Option<Value> {
    match value {
        Value::String(template) => render_string(template, vars).map(Value::String),
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(|v| render_value(v, vars)).collect(),
        )),
        Value::Object(map) => Some(Value::Object(render_object(map, vars))),
        other => Some(other.clone()),
    }
}

fn render_object(map: &Map<String, Value>, vars: &TemplateVars) -> Map<String, Value> {
    map.iter()
        .filter_map(|(k, v)| render_value(v, vars).map(|v| (k.clone(), v)))
        .collect()
}

fn render_string(template: &str, vars: &TemplateVars) -> Option<String> {
    // 整个字符串就是一个可选占位符，值为空时省略字段
    if let Some(caps) = placeholder_re().captures(template) {
        let whole = caps.get(0).map(|m| m.as_str()) == Some(template);
        if whole && caps.get(2).is_some() {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = vars.get(name).unwrap_or_default();
            return (!value.is_empty()).then(|| value.to_string());
        }
    }

    // 未知占位符原样保留，加载时已经校验过
    let rendered = placeholder_re().replace_all(template, |caps: &regex::Captures| {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match vars.get(name) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });
    Some(rendered.into_owned())
}

impl CandidateEntry {
    /// 渲染 JSON 请求体
    pub fn render_payload(&self, vars: &TemplateVars) -> Map<String, Value> {
        render_object(&self.payload, vars)
    }

    /// 渲染查询参数；GET 候选的请求体也会展开到查询参数里
    pub fn render_query(&self, vars: &TemplateVars) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = self
            .query
            .iter()
            .filter_map(|(k, v)| render_string(v, vars).map(|v| (k.clone(), v)))
            .collect();

        if self.method == HttpMethod::Get {
            for (key, value) in self.render_payload(vars) {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => continue,
                    other => other.to_string(),
                };
                query.push((key, value));
            }
        }
        query
    }
}
