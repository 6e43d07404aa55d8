//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use batch_uploader::upload::error::TransportError;
use batch_uploader::upload::scanner::{EntryKind, EntryReader, ScanEntry};
use batch_uploader::upload::transport::{BatchRequest, ProgressUpdate, Transport};
use batch_uploader::upload::FileHandle;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

pub const MB: u64 = 1_000_000;

pub fn file(name: &str, size: u64) -> FileHandle {
    FileHandle::new(name, size, format!("picked/{}", name), name)
}

pub fn names(files: &[FileHandle]) -> Vec<String> {
    files.iter().map(|f| f.name.clone()).collect()
}

// ── Entry tree ───────────────────────────────────────────────────────────────

/// A dropped tree held in memory. Reads sleep for a per-entry delay so
/// sibling listings finish out of order.
#[derive(Default, Clone)]
pub struct MemoryTree {
    listings: HashMap<String, Vec<ScanEntry>>,
    sizes: HashMap<String, u64>,
    failing: HashSet<String>,
    delays: HashMap<String, u64>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, full_path: &str) -> Self {
        self.listings.entry(full_path.to_string()).or_default();
        self.link(full_path, EntryKind::Directory);
        self
    }

    pub fn file(mut self, full_path: &str, size: u64) -> Self {
        self.sizes.insert(full_path.to_string(), size);
        self.link(full_path, EntryKind::File);
        self
    }

    pub fn slow(mut self, full_path: &str, millis: u64) -> Self {
        self.delays.insert(full_path.to_string(), millis);
        self
    }

    pub fn failing(mut self, full_path: &str) -> Self {
        self.failing.insert(full_path.to_string());
        self
    }

    /// Root entry for a path previously added to the tree.
    pub fn root(&self, full_path: &str) -> ScanEntry {
        let kind = if self.listings.contains_key(full_path) {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        ScanEntry {
            full_path: full_path.to_string(),
            location: PathBuf::from(full_path),
            kind,
        }
    }

    fn link(&mut self, full_path: &str, kind: EntryKind) {
        let Some((parent, name)) = full_path.rsplit_once('/') else {
            return;
        };
        if parent.is_empty() {
            return;
        }
        let parent_entry = ScanEntry::directory(parent, parent);
        let child = parent_entry.child(name, PathBuf::from(full_path), kind);
        self.listings.entry(parent.to_string()).or_default().push(child);
    }

    async fn pause(&self, path: &str) -> io::Result<()> {
        let millis = self.delays.get(path).copied().unwrap_or(1);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        if self.failing.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryReader for MemoryTree {
    async fn read_entries(&self, dir: &ScanEntry) -> io::Result<Vec<ScanEntry>> {
        self.pause(&dir.full_path).await?;
        self.listings
            .get(&dir.full_path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, dir.full_path.clone()))
    }

    async fn read_file(&self, entry: &ScanEntry) -> io::Result<FileHandle> {
        self.pause(&entry.full_path).await?;
        let size = self
            .sizes
            .get(&entry.full_path)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, entry.full_path.clone()))?;
        let name = Path::new(&entry.full_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileHandle::new(name, size, "", entry.location.clone()))
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

pub type ErrorFactory = fn() -> TransportError;

/// Records every batch, reports progress in quarters, and answers with a
/// JSON body naming the files, unless told to fail a given batch.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<BatchRequest>>,
    fail_at: Option<(usize, ErrorFactory)>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(batch: usize, error: ErrorFactory) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_at: Some((batch, error)),
        })
    }

    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn batch_names(&self) -> Vec<Vec<String>> {
        self.requests()
            .iter()
            .map(|r| names(&r.batch.files))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        request: BatchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<Value, TransportError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };

        let total = request.batch.total_bytes();
        for quarter in 1..=4u64 {
            let _ = progress.send((total * quarter / 4, total));
            tokio::task::yield_now().await;
        }

        if let Some((batch, error)) = self.fail_at {
            if batch == index {
                return Err(error());
            }
        }
        Ok(json!({ "batch": index, "files": names(&request.batch.files) }))
    }
}

// ── Recorders ────────────────────────────────────────────────────────────────

pub type TerminalCall = (Option<Vec<String>>, Option<Value>);

#[derive(Clone, Default)]
pub struct Recorder<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.inner.lock().unwrap().push(value);
    }

    pub fn values(&self) -> Vec<T> {
        self.inner.lock().unwrap().clone()
    }
}
