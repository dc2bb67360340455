//! 响应归一化
//!
//! 不同版本接口返回的字段名不一致，这里按别名顺序逐个尝试，
//! 把原始 JSON 映射为 [`FileEntry`] / 下载直链。

use serde_json::{Map, Value};
use thiserror::Error;

use super::candidates::FieldAliases;
use super::types::FileEntry;

/// 对象内部查找子数组时优先尝试的字段
const SUB_ARRAY_KEYS: &[&str] = &["list", "items"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("响应结构异常: {0}")]
pub struct Malformed(pub String);

/// 按点分路径取值，例如 `data.list`、`data.0.download_url`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn as_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => SUB_ARRAY_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .or_else(|| map.values().find_map(Value::as_array)),
        _ => None,
    }
}

/// 列表字段缺失时，data 为 null 或空对象视为“明确为空”
fn is_recognizably_empty(body: &Value, fields: &FieldAliases) -> bool {
    match body.get(&fields.data) {
        Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        _ => false,
    }
}

/// 把列表接口的响应体映射为文件条目
pub fn normalize_listing(
    body: &Value,
    list_aliases: &[String],
    fields: &FieldAliases,
) -> Result<Vec<FileEntry>, Malformed> {
    let items = list_aliases
        .iter()
        .filter_map(|alias| lookup(body, alias))
        .find_map(as_list);

    match items {
        Some(items) => Ok(items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| to_file_entry(item, fields))
            .collect()),
        None if is_recognizably_empty(body, fields) => Ok(Vec::new()),
        None => Err(Malformed(format!(
            "未找到列表字段 (尝试: {})",
            list_aliases.join(", ")
        ))),
    }
}

/// 响应中携带的 share_id（部分接口会返回与链接不同的内部 id）
pub fn normalize_share_id(body: &Value, fields: &FieldAliases) -> Option<String> {
    first_string(body, &fields.share_id)
}

/// 查找下载直链；每个别名先查顶层，再查 data 下一层
pub fn normalize_download_url(body: &Value, url_aliases: &[String]) -> Option<String> {
    let nested = match body.get("data") {
        Some(Value::Array(items)) => items.first(),
        Some(data @ Value::Object(_)) => Some(data),
        _ => None,
    };

    url_aliases.iter().find_map(|alias| {
        std::iter::once(Some(body))
            .chain(std::iter::once(nested))
            .flatten()
            .filter_map(|scope| lookup(scope, alias))
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(value: &Value, aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| lookup(value, alias))
        .find_map(scalar_string)
}

fn field_string(item: &Map<String, Value>, aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| item.get(alias))
        .find_map(scalar_string)
}

fn as_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}

fn to_file_entry(item: &Map<String, Value>, fields: &FieldAliases) -> FileEntry {
    let size_bytes = fields
        .size
        .iter()
        .filter_map(|alias| item.get(alias))
        .find_map(as_size)
        .unwrap_or(0);

    let flagged = fields
        .dir_flag
        .iter()
        .filter_map(|alias| item.get(alias))
        .any(is_truthy_flag);
    let folder_kind = fields
        .kind
        .iter()
        .filter_map(|alias| item.get(alias).and_then(Value::as_str))
        .any(|kind| {
            fields
                .folder_tokens
                .iter()
                .any(|token| token.eq_ignore_ascii_case(kind.trim()))
        });

    FileEntry {
        fid: field_string(item, &fields.fid).unwrap_or_default(),
        name: field_string(item, &fields.name).unwrap_or_default(),
        size_bytes,
        is_directory: flagged || folder_kind,
    }
}
