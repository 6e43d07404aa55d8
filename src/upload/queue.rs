use std::collections::VecDeque;

use tracing::{debug, info};

use crate::upload::filter::FileFilter;
use crate::upload::{Batch, FileHandle};

/// Default byte ceiling for one batch when not sending everything at once.
pub const BATCH_SIZE_CEILING: u64 = 30 * 1000 * 1000;
/// Default file-count ceiling for one batch.
pub const BATCH_COUNT_CEILING: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_bytes: BATCH_SIZE_CEILING,
            max_files: BATCH_COUNT_CEILING,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    /// Maximum number of accepted files; `None` is unbounded.
    pub file_limit: Option<usize>,
    pub batch_all: bool,
    pub limits: BatchLimits,
}

/// FIFO of files waiting to be sent, drained one batch at a time.
#[derive(Debug)]
pub struct UploadQueue {
    pending: VecDeque<FileHandle>,
    total_enqueued: usize,
    batch_all: bool,
    limits: BatchLimits,
}

impl UploadQueue {
    pub fn enqueue<I>(files: I, options: &QueueOptions, filter: Option<&dyn FileFilter>) -> Self
    where
        I: IntoIterator<Item = FileHandle>,
    {
        let mut pending = VecDeque::new();
        for file in files {
            if file.name.is_empty() {
                continue;
            }
            if let Some(limit) = options.file_limit {
                if pending.len() >= limit {
                    info!(limit, "truncating upload queue at file limit");
                    break;
                }
            }
            let admitted = match filter {
                Some(filter) => filter.filter(file),
                None => Some(file),
            };
            if let Some(file) = admitted {
                pending.push_back(file);
            }
        }

        debug!(files = pending.len(), batch_all = options.batch_all, "upload queue created");
        Self {
            total_enqueued: pending.len(),
            pending,
            batch_all: options.batch_all,
            limits: options.limits,
        }
    }

    /// Removes the next batch from the front of the queue.
    ///
    /// Files are taken while the batch is under both ceilings, so the file
    /// that crosses the byte ceiling still joins the batch. An empty batch
    /// means the queue is exhausted.
    pub fn next_batch(&mut self) -> Batch {
        if self.batch_all {
            return Batch {
                files: self.pending.drain(..).collect(),
            };
        }

        let mut files = Vec::new();
        let mut bytes = 0u64;
        while bytes < self.limits.max_bytes && files.len() < self.limits.max_files {
            let Some(file) = self.pending.pop_front() else {
                break;
            };
            bytes = bytes.saturating_add(file.size);
            files.push(file);
        }
        Batch { files }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn total_enqueued(&self) -> usize {
        self.total_enqueued
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn batch_all(&self) -> bool {
        self.batch_all
    }
}
