//! 分享链接解析
//!
//! 只接受：https://pan.quark.cn/s/<id>[?pwd=<提取码>]

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use super::error::ResolutionError;
use super::types::ShareReference;

pub const SHARE_HOST: &str = "pan.quark.cn";

fn alnum_re() -> &'static Regex {
    static ALNUM_RE: OnceLock<Regex> = OnceLock::new();
    ALNUM_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap())
}

/// 原样匹配整条链接：Url::parse 会去掉默认端口、折叠 `.`/`..`、删除制表符和换行
fn share_link_re() -> &'static Regex {
    static SHARE_LINK_RE: OnceLock<Regex> = OnceLock::new();
    SHARE_LINK_RE.get_or_init(|| {
        Regex::new(r"^(?i:https://pan\.quark\.cn)/s/[A-Za-z0-9]+(?:\?pwd=[A-Za-z0-9]+)?$").unwrap()
    })
}

/// 从分享链接中提取分享 id 与提取码
pub fn parse_share_link(share_url: &str) -> Result<ShareReference, ResolutionError> {
    let url = share_url.trim();
    if !share_link_re().is_match(url) {
        return Err(ResolutionError::invalid_link());
    }

    let parsed = Url::parse(url).map_err(|_| ResolutionError::invalid_link())?;

    if parsed.scheme() != "https"
        || parsed.host_str() != Some(SHARE_HOST)
        || parsed.port().is_some()
        || !parsed.username().is_empty()
        || parsed.password().is_some()
        || parsed.fragment().is_some()
    {
        return Err(ResolutionError::invalid_link());
    }

    // 路径必须恰好是 /s/<id>
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    let share_id = match segments.as_slice() {
        ["s", id] if alnum_re().is_match(id) => id.to_string(),
        _ => return Err(ResolutionError::invalid_link()),
    };

    let mut passcode = String::new();
    if let Some(query) = parsed.query() {
        // 只允许单个 pwd 参数
        let (key, value) = query
            .split_once('=')
            .ok_or_else(ResolutionError::invalid_link)?;
        if key != "pwd" || !alnum_re().is_match(value) {
            return Err(ResolutionError::invalid_link());
        }
        passcode = value.to_string();
    }

    Ok(ShareReference { share_id, passcode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quark::ErrorKind;

    #[test]
    fn test_parse_share_link_valid() {
        let test_cases = vec![
            ("https://pan.quark.cn/s/abc123", "abc123", ""),
            ("https://pan.quark.cn/s/1a2B3c?pwd=1234", "1a2B3c", "1234"),
            ("  https://pan.quark.cn/s/XYZ?pwd=abCD \n", "XYZ", "abCD"),
            ("HTTPS://PAN.QUARK.CN/s/abc", "abc", ""),
        ];

        for (url, id, pwd) in test_cases {
            let reference = parse_share_link(url).unwrap_or_else(|e| panic!("{}: {}", url, e));
            assert_eq!(reference.share_id, id, "Failed for URL: {}", url);
            assert_eq!(reference.passcode, pwd, "Failed for URL: {}", url);
        }
    }

    #[test]
    fn test_parse_share_link_invalid() {
        let invalid_urls = vec![
            "",
            "not-a-url",
            "http://pan.quark.cn/s/abc123",
            "https://pan.baidu.com/s/abc123",
            "https://evil.pan.quark.cn/s/abc123",
            "https://pan.quark.cn:8443/s/abc123",
            "https://pan.quark.cn/s/",
            "https://pan.quark.cn/s",
            "https://pan.quark.cn/abc123",
            "https://pan.quark.cn/s/abc_123",
            "https://pan.quark.cn/s/abc-123",
            "https://pan.quark.cn/s/abc123/",
            "https://pan.quark.cn/s/abc123/extra",
            "https://pan.quark.cn/s/abc123?pwd=",
            "https://pan.quark.cn/s/abc123?pwd=12-34",
            "https://pan.quark.cn/s/abc123?code=1234",
            "https://pan.quark.cn/s/abc123?pwd=1234&x=1",
            "https://pan.quark.cn/s/abc123#list",
            "https://pan.quark.cn:443/s/abc123",
            "https://pan.quark.cn/x/../s/abc123",
            "https://pan.quark.cn/s/./abc123",
            "https://pan.quark.cn/s/ab\tc123",
            "https://pan.quark.cn/s/abc\n123",
        ];

        for url in invalid_urls {
            let err = parse_share_link(url).expect_err(url);
            assert_eq!(err.kind, ErrorKind::InvalidLinkFormat, "URL: {}", url);
            assert!(err.attempts.is_empty());
        }
    }

    #[test]
    fn test_has_passcode() {
        assert!(parse_share_link("https://pan.quark.cn/s/a?pwd=9").unwrap().has_passcode());
        assert!(!parse_share_link("https://pan.quark.cn/s/a").unwrap().has_passcode());
    }
}
