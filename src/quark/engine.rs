//! 解析引擎
//!
//! 链接解析 → 列表探测 → 归一化；下载直链按文件单独获取，不做批量预取。
//! 引擎只持有不可变配置，可在多个任务间共享。

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::candidates::{CandidateTable, TemplateVars};
use super::error::{Attempt, ErrorKind, ResolutionError};
use super::normalize::{normalize_download_url, normalize_listing, normalize_share_id};
use super::parser::parse_share_link;
use super::probe::{EndpointProbe, Normalized, Probed};
use super::transport::{HttpTransport, Transport};
use super::types::{Credential, DirectoryListing, DownloadLink, Operation, ShareReference};
use crate::config::Config;

/// 分享根目录
pub const ROOT_DIR_FID: &str = "0";

pub struct ResolutionEngine {
    table: Arc<CandidateTable>,
    transport: Arc<dyn Transport>,
    attempt_timeout: Duration,
}

impl ResolutionEngine {
    pub fn new(table: CandidateTable, transport: Arc<dyn Transport>) -> Self {
        Self {
            table: Arc::new(table),
            transport,
            attempt_timeout: Duration::from_secs(Config::default_timeout_secs()),
        }
    }

    /// 单次候选请求的超时
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// 按配置构建：候选表来自 candidates_path，未配置时使用内置表
    pub fn from_config(config: &Config) -> Result<Self> {
        let table = match config.quark.candidates_path.as_deref() {
            Some(path) if !path.is_empty() => CandidateTable::load(path)?,
            _ => CandidateTable::builtin()?,
        };
        info!(
            "📋 候选表版本: {} (列表 {} 个, 直链 {} 个)",
            table.version,
            table.list_directory.len(),
            table.get_download_url.len()
        );

        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(table, Arc::new(transport)).with_attempt_timeout(config.attempt_timeout()))
    }

    pub fn table(&self) -> &CandidateTable {
        &self.table
    }

    fn endpoint_probe(&self) -> EndpointProbe<'_> {
        EndpointProbe::new(&self.table, self.transport.as_ref(), self.attempt_timeout)
    }

    /// 解析分享链接并列出根目录
    pub async fn resolve(
        &self,
        share_url: &str,
        credential: &Credential,
    ) -> Result<DirectoryListing, ResolutionError> {
        self.resolve_detailed(share_url, credential, &CancellationToken::new())
            .await
            .map(|probed| probed.value)
    }

    /// 同 [`resolve`](Self::resolve)，可取消，并返回生效候选与失败尝试日志
    pub async fn resolve_detailed(
        &self,
        share_url: &str,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Resolved<DirectoryListing>, ResolutionError> {
        let reference = parse_share_link(share_url)?;
        info!(
            "📥 解析分享: share_id={}, 提取码={}",
            reference.share_id,
            if reference.has_passcode() { "有" } else { "无" }
        );
        self.list_directory_detailed(&reference, ROOT_DIR_FID, credential, cancel)
            .await
    }

    /// 列出分享内的某个目录
    pub async fn list_directory(
        &self,
        reference: &ShareReference,
        dir_fid: &str,
        credential: &Credential,
    ) -> Result<DirectoryListing, ResolutionError> {
        self.list_directory_detailed(reference, dir_fid, credential, &CancellationToken::new())
            .await
            .map(|probed| probed.value)
    }

    pub async fn list_directory_detailed(
        &self,
        reference: &ShareReference,
        dir_fid: &str,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Resolved<DirectoryListing>, ResolutionError> {
        let vars = TemplateVars::for_reference(reference).set("dir_fid", dir_fid);
        let fields = &self.table.fields;

        let probed = self
            .endpoint_probe()
            .probe(
                Operation::ListDirectory,
                &vars,
                credential,
                cancel,
                |body, entry| {
                    let entries = normalize_listing(body, &entry.list_aliases, fields)?;
                    Ok(Normalized::Found(DirectoryListing {
                        share_id: normalize_share_id(body, fields)
                            .unwrap_or_else(|| reference.share_id.clone()),
                        dir_fid: dir_fid.to_string(),
                        entries,
                    }))
                },
            )
            .await?;

        let resolved = Resolved::require(probed)?;
        info!(
            "📁 目录 {} 共 {} 项 (候选: {})",
            dir_fid,
            resolved.value.entries.len(),
            resolved.candidate
        );
        Ok(resolved)
    }

    /// 获取单个文件的下载直链；所有接口都未返回直链时为 None
    pub async fn get_download_link(
        &self,
        reference: &ShareReference,
        fid: &str,
        credential: &Credential,
    ) -> Result<Option<DownloadLink>, ResolutionError> {
        self.get_download_link_detailed(reference, fid, credential, &CancellationToken::new())
            .await
            .map(|probed| probed.value)
    }

    pub async fn get_download_link_detailed(
        &self,
        reference: &ShareReference,
        fid: &str,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Probed<DownloadLink>, ResolutionError> {
        let vars = TemplateVars::for_reference(reference).set("fid", fid);
        self.download_with(vars, fid, credential, cancel).await
    }

    /// 使用列表响应中的 share_id 获取直链（部分接口返回的内部 id 与链接不同）
    pub async fn download_link_in(
        &self,
        listing: &DirectoryListing,
        fid: &str,
        credential: &Credential,
    ) -> Result<Option<DownloadLink>, ResolutionError> {
        let vars = TemplateVars::default()
            .set("share_id", listing.share_id.clone())
            .set("passcode", "")
            .set("fid", fid);
        self.download_with(vars, fid, credential, &CancellationToken::new())
            .await
            .map(|probed| probed.value)
    }

    async fn download_with(
        &self,
        vars: TemplateVars,
        fid: &str,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Probed<DownloadLink>, ResolutionError> {
        debug!("🔗 获取直链: fid={}", fid);

        let probed = self
            .endpoint_probe()
            .probe(
                Operation::GetDownloadUrl,
                &vars,
                credential,
                cancel,
                |body, entry| {
                    Ok(match normalize_download_url(body, &entry.url_aliases) {
                        Some(url) => Normalized::Found(DownloadLink {
                            fid: fid.to_string(),
                            url,
                        }),
                        None => Normalized::Empty,
                    })
                },
            )
            .await?;

        match &probed.value {
            Some(_) => info!("✅ 直链获取成功: fid={}", fid),
            None => info!("⚠️ 未获取到直链: fid={}", fid),
        }
        Ok(probed)
    }
}

/// 必定有结果的探测（列表操作）
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub candidate: String,
    pub attempts: Vec<Attempt>,
}

impl<T> Resolved<T> {
    fn require(probed: Probed<T>) -> Result<Self, ResolutionError> {
        match (probed.value, probed.candidate) {
            (Some(value), Some(candidate)) => Ok(Self {
                value,
                candidate,
                attempts: probed.attempts,
            }),
            _ => Err(ResolutionError::with_attempts(
                ErrorKind::AllEndpointsExhausted,
                probed.attempts,
            )),
        }
    }
}
