//! 配置文件加载

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::quark::Credential;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)] // 没有 [quark] 段时全部走默认值/环境变量
    pub quark: QuarkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuarkConfig {
    /// 浏览器里复制的完整 Cookie 字符串
    #[serde(default = "default_cookie")]
    pub cookie: String,
    /// 单次候选请求的超时
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// 自定义候选表路径，不填使用内置表
    #[serde(default = "default_candidates_path")]
    pub candidates_path: Option<String>,
}

impl Default for QuarkConfig {
    fn default() -> Self {
        Self {
            cookie: default_cookie(),
            http_timeout_secs: default_http_timeout_secs(),
            candidates_path: default_candidates_path(),
        }
    }
}

fn default_cookie() -> String {
    std::env::var("QUARK_COOKIE").unwrap_or_default()
}

fn default_http_timeout_secs() -> u64 {
    std::env::var("QUARK_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(Config::default_timeout_secs)
}

fn default_candidates_path() -> Option<String> {
    std::env::var("QUARK_CANDIDATES").ok().filter(|s| !s.is_empty())
}

impl Config {
    /// 读取配置文件；文件不存在时完全从环境变量构建
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.quark.http_timeout_secs == 0 {
            return Err(anyhow!("http_timeout_secs 必须大于 0"));
        }
        Ok(config)
    }

    /// 校验并取出登录凭证
    pub fn credential(&self) -> Result<Credential> {
        let credential = Credential::new(self.quark.cookie.clone());
        if credential.is_empty() {
            return Err(anyhow!(
                "Cookie 未配置，请在 config.toml 的 [quark] 中设置 cookie 或设置 QUARK_COOKIE"
            ));
        }
        Ok(credential)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.quark.http_timeout_secs)
    }

    pub fn default_timeout_secs() -> u64 {
        20
    }

    pub fn browser_ua() -> &'static str {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
    }
}
