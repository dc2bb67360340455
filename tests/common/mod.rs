//! 集成测试共用的脚本化传输层

#![allow(dead_code)]

use async_trait::async_trait;
use quark_direct_link::quark::{
    CandidateTable, ProbeRequest, RawResponse, Transport, TransportFailure,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub type Outcome = Result<RawResponse, TransportFailure>;

pub fn json(status: u16, body: Value) -> Outcome {
    Ok(RawResponse {
        status,
        body: body.to_string(),
    })
}

/// 按顺序返回预设响应，并记录收到的请求
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<ProbeRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ProbeRequest) -> Outcome {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Network("no scripted response".to_string())))
    }
}

/// 根据请求内容决定响应，适合并发场景
pub struct RoutedTransport<F> {
    route: F,
}

impl<F> RoutedTransport<F>
where
    F: Fn(&ProbeRequest) -> Outcome + Send + Sync,
{
    pub fn new(route: F) -> Arc<Self> {
        Arc::new(Self { route })
    }
}

#[async_trait]
impl<F> Transport for RoutedTransport<F>
where
    F: Fn(&ProbeRequest) -> Outcome + Send + Sync,
{
    async fn execute(&self, request: ProbeRequest) -> Outcome {
        tokio::task::yield_now().await;
        (self.route)(&request)
    }
}

/// 两个列表候选、两个直链候选，结构与内置表一致
pub fn two_by_two_table() -> CandidateTable {
    CandidateTable::from_toml_str(
        r#"
        version = "test"

        [[list_directory]]
        label = "primary-dir"
        endpoint = "https://drive.quark.cn/1/clouddrive/share/share_page/dir"
        query = { pr = "ucpro", fr = "pc" }
        payload = { pwd_id = "{share_id}", dir_fid = "{dir_fid}", pdir_fid = "{dir_fid}", force = 0, code = "{passcode?}" }
        list_aliases = ["data.list", "data.items"]

        [[list_directory]]
        label = "secondary-dir"
        endpoint = "https://drive-pc.quark.cn/1/clouddrive/share/share_page/dir"
        query = { pr = "ucpro", fr = "pc" }
        payload = { pwd_id = "{share_id}", dir_fid = "{dir_fid}", pdir_fid = "{dir_fid}", force = 0, code = "{passcode?}" }
        list_aliases = ["data.list", "data.items"]

        [[get_download_url]]
        label = "sharefile/download"
        endpoint = "https://drive.quark.cn/1/clouddrive/sharefile/download"
        query = { pr = "ucpro", fr = "pc" }
        payload = { share_id = "{share_id}", fid = "{fid}", sign_type = 2 }
        url_aliases = ["download_url"]

        [[get_download_url]]
        label = "file/download"
        endpoint = "https://drive.quark.cn/1/clouddrive/file/download"
        query = { pr = "ucpro", fr = "pc" }
        payload = { fid = "{fid}" }
        url_aliases = ["download_url"]
        "#,
    )
    .unwrap()
}
