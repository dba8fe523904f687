//! Consensus protocol seam
//!
//! The replicated log itself lives outside this crate. These types describe
//! what it hands to us (committed writes, reads, snapshot readers/writers) and
//! what we hand to it (a request processor with snapshot operations).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{PluginError, Result};

// ============================================================================
// Requests and Responses
// ============================================================================

/// Proposal for, or committed entry of, the replicated log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub group: String,
    pub data: Bytes,
    pub operation: String,
}

/// Local read against a replication group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub group: String,
    pub data: Bytes,
}

/// Outcome reported back to the protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub data: Option<Bytes>,
    pub err_msg: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            err_msg: None,
        }
    }

    pub fn ok_with(data: Bytes) -> Self {
        Self {
            success: true,
            data: Some(data),
            err_msg: None,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            err_msg: Some(msg.into()),
        }
    }

    pub fn error_message(&self) -> &str {
        self.err_msg.as_deref().unwrap_or("")
    }
}

// ============================================================================
// Processor and Snapshot Seams
// ============================================================================

/// State machine endpoint registered for one replication group
pub trait RequestProcessor: Send + Sync {
    fn group(&self) -> &str;

    /// Read path
    fn on_request(&self, request: &ReadRequest) -> Response;

    /// Committed-entry callback; must never panic or return early with an error
    fn on_apply(&self, request: &WriteRequest) -> Response;

    /// Handlers used by the protocol for log compaction
    fn snapshot_operations(&self) -> Vec<Arc<dyn SnapshotOperation>>;
}

/// Completion callback of a snapshot save
pub type SnapshotCallback = Box<dyn FnOnce(bool, Option<PluginError>) + Send>;

/// Save/load handler invoked by the protocol
pub trait SnapshotOperation: Send + Sync {
    fn on_snapshot_save(&self, writer: &dyn SnapshotWriter, done: SnapshotCallback);

    fn on_snapshot_load(&self, reader: &dyn SnapshotReader) -> bool;
}

/// Per-file metadata stored next to a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileMeta {
    entries: BTreeMap<String, String>,
}

impl LocalFileMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

/// Destination of a snapshot being saved
pub trait SnapshotWriter: Send + Sync {
    /// Directory the snapshot files go into
    fn path(&self) -> &Path;

    /// Register a file written under `path()`; false when it could not be recorded
    fn add_file(&self, file_name: &str, meta: LocalFileMeta) -> bool;
}

/// Source of a snapshot being loaded
pub trait SnapshotReader: Send + Sync {
    fn path(&self) -> &Path;

    fn file_meta(&self, file_name: &str) -> Option<LocalFileMeta>;

    fn list_files(&self) -> Vec<String>;
}

/// Client side of the consensus protocol
#[async_trait]
pub trait CpProtocol: Send + Sync {
    /// Submit a proposal; returns once the protocol accepted or rejected it
    async fn write(&self, request: WriteRequest) -> anyhow::Result<Response>;

    fn add_request_processor(&self, processor: Arc<dyn RequestProcessor>) -> anyhow::Result<()>;
}

// ============================================================================
// Directory Snapshot Store
// ============================================================================

/// Sidecar document holding per-file metadata
pub const SNAPSHOT_META_FILE: &str = "snapshot_meta.json";

/// Snapshot writer and reader over a plain directory
///
/// Metadata lives in a JSON sidecar so archives can be produced and inspected
/// without a running protocol.
pub struct DirectorySnapshotStore {
    dir: PathBuf,
    files: Mutex<BTreeMap<String, LocalFileMeta>>,
}

impl DirectorySnapshotStore {
    /// Open `dir`, creating it if needed and reading an existing sidecar
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let sidecar = dir.join(SNAPSHOT_META_FILE);
        let files = if sidecar.exists() {
            let content = fs::read_to_string(&sidecar)?;
            serde_json::from_str(&content).map_err(|e| {
                PluginError::SnapshotIo(format!("Invalid {}: {}", sidecar.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            dir,
            files: Mutex::new(files),
        })
    }

    fn persist(&self, files: &BTreeMap<String, LocalFileMeta>) -> Result<()> {
        let sidecar = self.dir.join(SNAPSHOT_META_FILE);
        let tmp = sidecar.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(files)?)?;
        fs::rename(&tmp, &sidecar)?;
        Ok(())
    }
}

impl SnapshotWriter for DirectorySnapshotStore {
    fn path(&self) -> &Path {
        &self.dir
    }

    fn add_file(&self, file_name: &str, meta: LocalFileMeta) -> bool {
        if !self.dir.join(file_name).exists() {
            warn!("[Snapshot] Refusing to record missing file {}", file_name);
            return false;
        }
        let mut files = self.files.lock();
        files.insert(file_name.to_string(), meta);
        match self.persist(&files) {
            Ok(()) => true,
            Err(e) => {
                error!("[Snapshot] Failed to record metadata for {}: {}", file_name, e);
                false
            },
        }
    }
}

impl SnapshotReader for DirectorySnapshotStore {
    fn path(&self) -> &Path {
        &self.dir
    }

    fn file_meta(&self, file_name: &str) -> Option<LocalFileMeta> {
        self.files.lock().get(file_name).cloned()
    }

    fn list_files(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}
