//! 数据类型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 解析后的分享引用（不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReference {
    pub share_id: String,
    /// 提取码，没有时为空字符串
    pub passcode: String,
}

impl ShareReference {
    pub fn has_passcode(&self) -> bool {
        !self.passcode.is_empty()
    }
}

/// 调用方提供的登录 Cookie，引擎只原样附带，不解析
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self(cookie.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub fid: String,
    pub name: String,
    pub size_bytes: u64,
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    /// 服务端返回的 share_id，缺失时为链接中的分享 id
    pub share_id: String,
    /// 被列举的目录，"0" 为分享根目录
    pub dir_fid: String,
    pub entries: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| !e.is_directory)
    }

    pub fn directories(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| e.is_directory)
    }
}

/// 带签名、有时效的下载直链
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub fid: String,
    pub url: String,
}

/// 两类需要探测的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListDirectory,
    GetDownloadUrl,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ListDirectory => f.write_str("list_directory"),
            Operation::GetDownloadUrl => f.write_str("get_download_url"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("__puus=secret-value; __pus=abc");
        let shown = format!("{:?}", cred);
        assert!(!shown.contains("secret"));
        assert_eq!(cred.as_str(), "__puus=secret-value; __pus=abc");
    }

    #[test]
    fn test_credential_trims_whitespace() {
        assert_eq!(Credential::new("  a=1 \n").as_str(), "a=1");
        assert!(Credential::new("   ").is_empty());
    }

    #[test]
    fn test_listing_serializes_camel_case() {
        let listing = DirectoryListing {
            share_id: "abc123".to_string(),
            dir_fid: "0".to_string(),
            entries: vec![FileEntry {
                fid: "f1".to_string(),
                name: "a.txt".to_string(),
                size_bytes: 10,
                is_directory: false,
            }],
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["shareId"], "abc123");
        assert_eq!(json["entries"][0]["sizeBytes"], 10);
        assert_eq!(json["entries"][0]["isDirectory"], false);
    }
}
