use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arbor::config::ReplicationConfig;
use arbor::naming::{NamingService, Registry, StorageNodeInfo};
use arbor::storage::{HttpStorageClient, StorageAddress, StorageClient};
use arbor::wire::{
    BooleanReturn, CopyRequest, DataReturn, ExceptionReturn, PathRequest, ReadRequest,
    SizeReturn, WriteRequest,
};
use arbor::{ArborError, Result};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Get the path to the arbor binary for testing.
#[allow(dead_code)]
pub fn get_arbor_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("arbor").to_path_buf()
}

/// One remote call seen by [`RecordingStorageClient`]. Nodes are recorded by host.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum StorageCall {
    Create { node: String, path: String },
    Delete { node: String, path: String },
    Copy { node: String, path: String, source: String },
    Read { node: String, path: String },
    Write { node: String, path: String },
    Size { node: String, path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(dead_code)]
pub enum Op {
    Create,
    Delete,
    Copy,
}

/// In-memory storage double: records every call and fails the ops it is told to.
#[derive(Default)]
pub struct RecordingStorageClient {
    calls: Mutex<Vec<StorageCall>>,
    failing: Mutex<HashSet<Op>>,
    copy_delay: Mutex<Option<Duration>>,
}

#[allow(dead_code)]
impl RecordingStorageClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().clone()
    }

    pub fn copies(&self) -> Vec<StorageCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StorageCall::Copy { .. }))
            .collect()
    }

    pub fn deletes(&self) -> Vec<StorageCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StorageCall::Delete { .. }))
            .collect()
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.failing.lock().remove(&op);
    }

    /// Make every later copy call take `delay` before it answers.
    pub fn slow_copies(&self, delay: Option<Duration>) {
        *self.copy_delay.lock() = delay;
    }

    /// Destination hosts of the copy calls made so far.
    pub fn copy_targets(&self) -> Vec<String> {
        self.copies()
            .into_iter()
            .filter_map(|call| match call {
                StorageCall::Copy { node, .. } => Some(node),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StorageCall, op: Option<Op>, node: &StorageAddress) -> Result<()> {
        self.calls.lock().push(call);
        match op {
            Some(op) if self.failing.lock().contains(&op) => Err(ArborError::Storage {
                node: node.to_string(),
                message: format!("{:?} refused", op),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageClient for RecordingStorageClient {
    async fn create_file(&self, node: &StorageAddress, path: &str) -> Result<()> {
        let call = StorageCall::Create {
            node: node.host.clone(),
            path: path.to_string(),
        };
        self.record(call, Some(Op::Create), node)
    }

    async fn delete_file(&self, node: &StorageAddress, path: &str) -> Result<()> {
        let call = StorageCall::Delete {
            node: node.host.clone(),
            path: path.to_string(),
        };
        self.record(call, Some(Op::Delete), node)
    }

    async fn read_file(
        &self,
        node: &StorageAddress,
        path: &str,
        _offset: u64,
        _length: u64,
    ) -> Result<Vec<u8>> {
        let call = StorageCall::Read {
            node: node.host.clone(),
            path: path.to_string(),
        };
        self.record(call, None, node).map(|_| Vec::new())
    }

    async fn write_file(
        &self,
        node: &StorageAddress,
        path: &str,
        _offset: u64,
        _data: &[u8],
    ) -> Result<()> {
        let call = StorageCall::Write {
            node: node.host.clone(),
            path: path.to_string(),
        };
        self.record(call, None, node)
    }

    async fn size_of(&self, node: &StorageAddress, path: &str) -> Result<u64> {
        let call = StorageCall::Size {
            node: node.host.clone(),
            path: path.to_string(),
        };
        self.record(call, None, node).map(|_| 0)
    }

    async fn copy_file(
        &self,
        node: &StorageAddress,
        path: &str,
        source: &StorageAddress,
    ) -> Result<()> {
        let call = StorageCall::Copy {
            node: node.host.clone(),
            path: path.to_string(),
            source: source.host.clone(),
        };
        let delay = *self.copy_delay.lock();
        let outcome = self.record(call, Some(Op::Copy), node);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// Storage node `idx` as registered by [`TestCluster`]: host `node{idx}`.
#[allow(dead_code)]
pub fn node_info(idx: usize) -> StorageNodeInfo {
    StorageNodeInfo::new(format!("node{}", idx), 7000, 7001)
}

/// A naming service wired to a [`RecordingStorageClient`].
#[allow(dead_code)]
pub struct TestCluster {
    pub service: Arc<NamingService>,
    pub storage: Arc<RecordingStorageClient>,
}

#[allow(dead_code)]
impl TestCluster {
    /// Service with `nodes` storage nodes registered, none advertising files.
    pub async fn new(nodes: usize) -> Self {
        Self::with_replication(nodes, ReplicationConfig::default()).await
    }

    pub async fn with_replication(nodes: usize, replication: ReplicationConfig) -> Self {
        let storage = RecordingStorageClient::new();
        let service = Arc::new(NamingService::new(
            Arc::new(Registry::new()),
            storage.clone(),
            &replication,
        ));
        for idx in 0..nodes {
            service
                .register_storage_node(node_info(idx), &["/".to_string()])
                .await
                .expect("Failed to register storage node");
        }
        Self { service, storage }
    }

    /// Add `path` as a file whose authoritative copy lives on `node{origin}`.
    pub async fn add_file(&self, path: &str, origin: usize) {
        let added = self
            .service
            .add_file(path, false, Some(node_info(origin).id()))
            .await
            .expect("Failed to add file");
        assert!(added, "{} already existed", path);
    }

    /// Hosts holding `path`, authoritative copy first.
    pub fn replica_hosts(&self, path: &str) -> Vec<String> {
        self.service
            .find_node(path)
            .expect("path should exist")
            .replicas()
            .into_iter()
            .map(|id| id.0.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn read_cycle(&self, path: &str, times: usize) {
        for _ in 0..times {
            self.service.lock(path, false).await.expect("shared lock");
            self.service.unlock(path, false).expect("shared unlock");
        }
    }
}

/// Isolated config directory for tests that touch the config file.
#[allow(dead_code)]
pub struct TestConfigContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

#[allow(dead_code)]
impl TestConfigContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    pub fn write(&self, contents: &str) {
        std::fs::write(&self.config_path, contents).expect("Failed to write config");
    }
}

impl Default for TestConfigContext {
    fn default() -> Self {
        Self::new()
    }
}

struct FakeNodeState {
    files: Mutex<HashMap<String, Vec<u8>>>,
    peer: HttpStorageClient,
}

/// A storage node served in-process over HTTP, backed by a map of file contents.
///
/// It serves both the client and command endpoints on one port.
#[allow(dead_code)]
pub struct FakeStorageNode {
    pub address: StorageAddress,
    state: Arc<FakeNodeState>,
}

#[allow(dead_code)]
impl FakeStorageNode {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeNodeState {
            files: Mutex::new(HashMap::new()),
            peer: HttpStorageClient::new(Duration::from_secs(5)).expect("client"),
        });
        let router = Router::new()
            .route("/storage_create", post(fake_create))
            .route("/storage_delete", post(fake_delete))
            .route("/storage_read", post(fake_read))
            .route("/storage_write", post(fake_write))
            .route("/storage_size", post(fake_size))
            .route("/storage_copy", post(fake_copy))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake storage node");
        let port = listener.local_addr().expect("local addr").port();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            address: StorageAddress::new("127.0.0.1", port),
            state,
        }
    }

    /// Registration record for this node; both ports point at the same listener.
    pub fn info(&self) -> StorageNodeInfo {
        StorageNodeInfo::new(self.address.host.clone(), self.address.port, self.address.port)
    }

    pub fn put(&self, path: &str, data: &[u8]) {
        self.state.files.lock().insert(path.to_string(), data.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.files.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

type FakeState = State<Arc<FakeNodeState>>;

fn exception(status: StatusCode, kind: &str, info: String) -> Response {
    let body = ExceptionReturn {
        exception_type: kind.to_string(),
        exception_info: info,
    };
    (status, Json(body)).into_response()
}

fn not_found(path: &str) -> Response {
    exception(
        StatusCode::NOT_FOUND,
        "FileNotFoundException",
        format!("{} does not exist", path),
    )
}

async fn fake_create(State(state): FakeState, Json(req): Json<PathRequest>) -> Json<BooleanReturn> {
    let mut files = state.files.lock();
    let success = !files.contains_key(&req.path);
    if success {
        files.insert(req.path, Vec::new());
    }
    Json(BooleanReturn { success })
}

async fn fake_delete(State(state): FakeState, Json(req): Json<PathRequest>) -> Json<BooleanReturn> {
    let mut files = state.files.lock();
    let prefix = format!("{}/", req.path.trim_end_matches('/'));
    let before = files.len();
    files.retain(|path, _| path != &req.path && !path.starts_with(&prefix));
    Json(BooleanReturn {
        success: files.len() < before,
    })
}

async fn fake_read(State(state): FakeState, Json(req): Json<ReadRequest>) -> Response {
    let files = state.files.lock();
    let Some(bytes) = files.get(&req.path) else {
        return not_found(&req.path);
    };
    let end = req.offset + req.length;
    if end > bytes.len() as u64 {
        return exception(
            StatusCode::BAD_REQUEST,
            "IndexOutOfBoundsException",
            format!("read past end of {}", req.path),
        );
    }
    let data = STANDARD.encode(&bytes[req.offset as usize..end as usize]);
    Json(DataReturn { data }).into_response()
}

async fn fake_write(State(state): FakeState, Json(req): Json<WriteRequest>) -> Response {
    let Ok(data) = STANDARD.decode(&req.data) else {
        return exception(
            StatusCode::BAD_REQUEST,
            "IllegalArgumentException",
            "bad base64".to_string(),
        );
    };
    let mut files = state.files.lock();
    let Some(bytes) = files.get_mut(&req.path) else {
        return not_found(&req.path);
    };
    let offset = req.offset as usize;
    if bytes.len() < offset + data.len() {
        bytes.resize(offset + data.len(), 0);
    }
    bytes[offset..offset + data.len()].copy_from_slice(&data);
    Json(BooleanReturn { success: true }).into_response()
}

async fn fake_size(State(state): FakeState, Json(req): Json<PathRequest>) -> Response {
    match state.files.lock().get(&req.path) {
        Some(bytes) => Json(SizeReturn {
            size: bytes.len() as u64,
        })
        .into_response(),
        None => not_found(&req.path),
    }
}

async fn fake_copy(State(state): FakeState, Json(req): Json<CopyRequest>) -> Response {
    let source = StorageAddress::new(req.server_ip, req.server_port);
    let copied = async {
        let size = state.peer.size_of(&source, &req.path).await?;
        state.peer.read_file(&source, &req.path, 0, size).await
    }
    .await;
    match copied {
        Ok(bytes) => {
            state.files.lock().insert(req.path, bytes);
            Json(BooleanReturn { success: true }).into_response()
        }
        Err(e) => exception(StatusCode::BAD_REQUEST, e.exception_type(), e.to_string()),
    }
}
