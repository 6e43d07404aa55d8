//! Recursive scan of dropped files and folders.
//!
//! Each discovered entry is read in its own task, so sibling listings
//! complete in any order. A single reconciliation loop owns the counters
//! and decides when the walk is finished: every found entry has been
//! processed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::upload::error::ScanError;
use crate::upload::FileHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A dropped file-system entry, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Path from the drop root, always starting with `/`.
    pub full_path: String,
    pub location: PathBuf,
    pub kind: EntryKind,
}

impl ScanEntry {
    pub fn file(full_path: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            full_path: full_path.into(),
            location: location.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(full_path: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            full_path: full_path.into(),
            location: location.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Builds a root entry for something dropped onto the window.
    pub fn from_dropped_path(path: &Path) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let full_path = format!("/{}", name);
        if std::fs::metadata(path)?.is_dir() {
            Ok(Self::directory(full_path, path))
        } else {
            Ok(Self::file(full_path, path))
        }
    }

    pub fn child(&self, name: &str, location: PathBuf, kind: EntryKind) -> Self {
        Self {
            full_path: format!("{}/{}", self.full_path.trim_end_matches('/'), name),
            location,
            kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Reads directory listings and file metadata for the scanner.
#[async_trait]
pub trait EntryReader: Send + Sync + 'static {
    async fn read_entries(&self, dir: &ScanEntry) -> io::Result<Vec<ScanEntry>>;

    /// Materialises a file entry. The handle's `full_path` is overwritten
    /// by the scanner.
    async fn read_file(&self, file: &ScanEntry) -> io::Result<FileHandle>;
}

/// Reads entries from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEntryReader;

#[async_trait]
impl EntryReader for LocalEntryReader {
    async fn read_entries(&self, dir: &ScanEntry) -> io::Result<Vec<ScanEntry>> {
        let mut children = Vec::new();
        let mut listing = tokio::fs::read_dir(&dir.location).await?;
        while let Some(entry) = listing.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            children.push(dir.child(&name, entry.path(), kind));
        }
        Ok(children)
    }

    async fn read_file(&self, file: &ScanEntry) -> io::Result<FileHandle> {
        let metadata = tokio::fs::metadata(&file.location).await?;
        let name = file
            .location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileHandle::new(
            name,
            metadata.len(),
            file.full_path.clone(),
            file.location.clone(),
        ))
    }
}

/// Found/processed counters for one drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub files_found: usize,
    pub files_processed: usize,
    pub folders_found: usize,
    pub folders_processed: usize,
}

impl ScanState {
    fn discovered(&self) -> bool {
        self.files_found + self.folders_found > 0
    }

    /// True once every discovered entry has been read.
    pub fn is_complete(&self) -> bool {
        self.discovered()
            && self.files_processed == self.files_found
            && self.folders_processed == self.folders_found
    }

    fn found(&mut self, entry: &ScanEntry) {
        match entry.kind {
            EntryKind::File => self.files_found += 1,
            EntryKind::Directory => self.folders_found += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub files: Vec<FileHandle>,
    pub state: ScanState,
}

enum ScanEvent {
    Listed(Vec<ScanEntry>),
    File(FileHandle),
}

pub struct DirectoryScanner {
    reader: Arc<dyn EntryReader>,
}

impl DirectoryScanner {
    pub fn new<R: EntryReader>(reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }

    pub fn local() -> Self {
        Self::new(LocalEntryReader)
    }

    /// Walks `roots` and returns every file found beneath them.
    ///
    /// `on_file` sees each file as soon as it has been read. A drop with no
    /// roots returns an empty report without touching the reader.
    pub async fn scan<F>(&self, roots: Vec<ScanEntry>, mut on_file: F) -> Result<ScanReport, ScanError>
    where
        F: FnMut(&FileHandle),
    {
        let mut report = ScanReport::default();
        if roots.is_empty() {
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        for root in roots {
            self.spawn_read(&mut tasks, &mut report.state, root);
        }

        while let Some(joined) = tasks.join_next().await {
            let event = match joined {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    warn!(error = %e, "scan read failed");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(ScanError::Aborted(e.to_string()));
                }
            };

            match event {
                ScanEvent::Listed(children) => {
                    // Children are counted before their parent is marked
                    // processed so the counters never look finished early.
                    for child in children {
                        self.spawn_read(&mut tasks, &mut report.state, child);
                    }
                    report.state.folders_processed += 1;
                }
                ScanEvent::File(file) => {
                    report.state.files_processed += 1;
                    on_file(&file);
                    report.files.push(file);
                }
            }

            if report.state.is_complete() {
                debug_assert!(tasks.is_empty());
                info!(
                    files = report.state.files_found,
                    folders = report.state.folders_found,
                    "scan complete"
                );
                return Ok(report);
            }
        }

        // Only reachable if the counters disagree with the task set.
        Err(ScanError::Aborted(format!(
            "scan ended with unfinished entries: {:?}",
            report.state
        )))
    }

    fn spawn_read(
        &self,
        tasks: &mut JoinSet<Result<ScanEvent, ScanError>>,
        state: &mut ScanState,
        entry: ScanEntry,
    ) {
        state.found(&entry);
        debug!(path = %entry.full_path, dir = entry.is_dir(), "found entry");
        let reader = Arc::clone(&self.reader);
        tasks.spawn(async move {
            let read_error = |source| ScanError::Read {
                path: entry.location.clone(),
                source,
            };
            match entry.kind {
                EntryKind::Directory => reader
                    .read_entries(&entry)
                    .await
                    .map(ScanEvent::Listed)
                    .map_err(read_error),
                EntryKind::File => {
                    let mut file = reader.read_file(&entry).await.map_err(read_error)?;
                    file.full_path = entry.full_path.clone();
                    Ok(ScanEvent::File(file))
                }
            }
        });
    }
}
