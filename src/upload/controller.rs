use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::upload::error::{SubmissionError, TransportError};
use crate::upload::hooks::{Decision, Hooks};
use crate::upload::progress::ProgressTracker;
use crate::upload::queue::{QueueOptions, UploadQueue};
use crate::upload::scanner::{DirectoryScanner, ScanEntry};
use crate::upload::transport::{BatchRequest, FormFields, Transport};
use crate::upload::{FileHandle, SubmissionOutcome, SubmissionState};
use crate::utils::file_size::FileSizeUtils;

/// Per-submission settings forwarded with every batch.
#[derive(Debug, Clone, Default)]
pub struct SubmissionOptions {
    pub collision: Option<String>,
    pub data_designation: Option<String>,
    pub label_with_folder: bool,
    pub fields: FormFields,
    pub queue: QueueOptions,
}

/// Drives one submission at a time from intake to a terminal state.
///
/// Submitting borrows the controller mutably, so a second submission can
/// only start once the previous one is back in `Idle`.
pub struct SubmissionController {
    transport: Arc<dyn Transport>,
    scanner: DirectoryScanner,
    options: SubmissionOptions,
    hooks: Hooks,
    state: SubmissionState,
}

impl SubmissionController {
    pub fn new(transport: Arc<dyn Transport>, options: SubmissionOptions, hooks: Hooks) -> Self {
        Self {
            transport,
            scanner: DirectoryScanner::local(),
            options,
            hooks,
            state: SubmissionState::Idle,
        }
    }

    pub fn with_scanner(mut self, scanner: DirectoryScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Submits files chosen with a picker.
    pub async fn submit_files(&mut self, files: Vec<FileHandle>) -> SubmissionOutcome {
        let Some(fields) = self.run_before_hook() else {
            return SubmissionOutcome::Cancelled;
        };
        self.transition(SubmissionState::Queued);
        self.run(files, fields).await
    }

    /// Scans dropped entries and submits every file found beneath them.
    pub async fn submit_drop(&mut self, roots: Vec<ScanEntry>) -> SubmissionOutcome {
        if roots.is_empty() {
            debug!("drop without entries ignored");
            return SubmissionOutcome::Ignored;
        }

        self.transition(SubmissionState::Scanning);
        let files = match self.scanner.scan(roots, |_| {}).await {
            Ok(report) => report.files,
            Err(e) => return self.fail(SubmissionError::Scan(e)),
        };

        let Some(fields) = self.run_before_hook() else {
            return SubmissionOutcome::Cancelled;
        };
        self.transition(SubmissionState::Queued);
        self.run(files, fields).await
    }

    /// Returns the form fields for this submission, or `None` if the hook
    /// aborted.
    fn run_before_hook(&mut self) -> Option<FormFields> {
        let mut fields = self.options.fields.clone();
        if let Some(hook) = self.hooks.before.clone() {
            if hook.before(&mut fields) == Decision::Abort {
                info!("submission cancelled by before-upload hook");
                self.transition(SubmissionState::Idle);
                return None;
            }
        }
        Some(fields)
    }

    async fn run(&mut self, files: Vec<FileHandle>, fields: FormFields) -> SubmissionOutcome {
        let mut queue = UploadQueue::enqueue(files, &self.options.queue, self.hooks.filter.as_deref());
        if queue.is_empty() {
            info!("nothing to upload after filtering");
            self.transition(SubmissionState::Succeeded);
            self.terminate(None, None);
            return SubmissionOutcome::Empty;
        }

        let total = queue.total_enqueued();
        info!(files = total, batch_all = queue.batch_all(), "starting upload");
        let mut tracker = ProgressTracker::new(total);
        self.report_progress(0.0);

        let mut batch_index = 0;
        loop {
            let remaining_before = queue.remaining();
            let batch = queue.next_batch();
            debug_assert!(!batch.is_empty(), "loop runs only while files are pending");

            self.transition(SubmissionState::Sending { batch: batch_index });
            info!(
                batch = batch_index,
                files = batch.len(),
                size = %FileSizeUtils::format_size(batch.total_bytes()),
                "uploading batch"
            );
            let baseline = tracker.begin_batch(remaining_before, batch.len());
            self.report_progress(baseline);

            let request = BatchRequest {
                batch: batch.clone(),
                collision: self.options.collision.clone(),
                data_designation: self.options.data_designation.clone(),
                label_with_folder: self.options.label_with_folder,
                fields: fields.clone(),
            };

            let response = match self.send_batch(request, &mut tracker).await {
                Ok(response) => response,
                Err(e) => break self.fail(SubmissionError::Transport(e)),
            };
            let value = tracker.complete_batch();
            self.report_progress(value);
            debug!(batch = batch_index, "batch acknowledged");
            batch_index += 1;

            if queue.is_empty() {
                self.transition(SubmissionState::Succeeded);
                self.terminate(Some(batch.files.as_slice()), Some(&response));
                break SubmissionOutcome::Succeeded {
                    batches: batch_index,
                    files: total,
                    response,
                };
            }
        }
    }

    /// Sends one batch while forwarding its byte progress.
    async fn send_batch(
        &mut self,
        request: BatchRequest,
        tracker: &mut ProgressTracker,
    ) -> Result<Value, TransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = Arc::clone(&self.transport);
        let send = transport.send(request, tx);
        tokio::pin!(send);

        let result = loop {
            tokio::select! {
                biased;
                Some((sent, total)) = rx.recv() => {
                    let value = tracker.on_bytes(sent, total);
                    self.report_progress(value);
                }
                result = &mut send => break result,
            }
        };
        while let Ok((sent, total)) = rx.try_recv() {
            let value = tracker.on_bytes(sent, total);
            self.report_progress(value);
        }
        result
    }

    fn fail(&mut self, error: SubmissionError) -> SubmissionOutcome {
        let message = error.user_message();
        error!(error = %error, "upload failed");
        self.transition(SubmissionState::Failed);
        self.terminate(None, None);
        SubmissionOutcome::Failed { error, message }
    }

    /// Invokes the terminal callback and releases the submission.
    fn terminate(&mut self, files: Option<&[FileHandle]>, response: Option<&Value>) {
        if let Some(callback) = self.hooks.on_terminal.as_mut() {
            callback(files, response);
        }
        self.transition(SubmissionState::Idle);
    }

    fn report_progress(&mut self, value: f64) {
        if let Some(sink) = self.hooks.on_progress.as_mut() {
            sink(value);
        }
    }

    fn transition(&mut self, to: SubmissionState) {
        if self.state == to {
            return;
        }
        debug!(from = ?self.state, to = ?to, "submission state");
        self.state = to;
        if let Some(listener) = self.hooks.on_state.as_mut() {
            listener(to);
        }
    }
}
