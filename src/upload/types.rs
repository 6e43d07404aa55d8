use std::path::PathBuf;

use crate::upload::error::SubmissionError;

/// A file selected for upload. Content is read lazily by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    /// Path relative to the selection root, e.g. `/photos/2021/a.jpg` for a
    /// dropped folder or `photos/2021/a.jpg` for a picked one. May be empty.
    pub full_path: String,
    pub location: PathBuf,
}

impl FileHandle {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        full_path: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            full_path: full_path.into(),
            location: location.into(),
        }
    }
}

/// Files sent together in one transport call, in queue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub files: Vec<FileHandle>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Scanning,
    Queued,
    /// Zero-based index of the batch in flight.
    Sending { batch: usize },
    Succeeded,
    Failed,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    Succeeded {
        batches: usize,
        files: usize,
        response: serde_json::Value,
    },
    /// Nothing survived the filter and file limit; no request was made.
    Empty,
    Failed {
        error: SubmissionError,
        message: String,
    },
    /// The before-upload hook declined.
    Cancelled,
    /// A drop with no entries, or a submit while another one was running.
    Ignored,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Empty)
    }
}
