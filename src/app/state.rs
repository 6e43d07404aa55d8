use std::sync::mpsc::Receiver;

use batch_uploader::upload::{SubmissionOutcome, SubmissionState};

/// Messages from the submission worker to the UI thread.
#[derive(Debug)]
pub enum WorkerEvent {
    State(SubmissionState),
    Progress(f64),
    Finished(SubmissionOutcome),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionProgress {
    NotStarted,
    Scanning,
    Uploading { fraction: f64, batch: usize },
    Completed { files: usize, batches: usize },
    NothingToUpload,
    Cancelled,
    Failed,
}

impl Default for ActionProgress {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Default)]
pub struct UploadState {
    pub progress: ActionProgress,
    pub error_message: Option<String>,
    pub last_response: Option<String>,
    pub is_uploading: bool,
    pub receiver: Option<Receiver<WorkerEvent>>,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    pub fn begin(&mut self, receiver: Receiver<WorkerEvent>) {
        self.clear();
        self.is_uploading = true;
        self.receiver = Some(receiver);
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::State(SubmissionState::Scanning) => {
                self.progress = ActionProgress::Scanning;
            }
            WorkerEvent::State(SubmissionState::Sending { batch }) => {
                let fraction = self.get_progress_percentage() as f64;
                self.progress = ActionProgress::Uploading { fraction, batch };
            }
            WorkerEvent::State(_) => {}
            WorkerEvent::Progress(value) => match &mut self.progress {
                ActionProgress::Uploading { fraction, .. } => *fraction = value,
                other => {
                    *other = ActionProgress::Uploading {
                        fraction: value,
                        batch: 0,
                    }
                }
            },
            WorkerEvent::Finished(outcome) => self.finish(outcome),
        }
    }

    fn finish(&mut self, outcome: SubmissionOutcome) {
        self.is_uploading = false;
        self.receiver = None;
        self.progress = match outcome {
            SubmissionOutcome::Succeeded {
                batches,
                files,
                response,
            } => {
                self.last_response = Some(response.to_string());
                ActionProgress::Completed { files, batches }
            }
            SubmissionOutcome::Empty => ActionProgress::NothingToUpload,
            SubmissionOutcome::Failed { message, .. } => {
                self.error_message = Some(message);
                ActionProgress::Failed
            }
            SubmissionOutcome::Cancelled => ActionProgress::Cancelled,
            SubmissionOutcome::Ignored => ActionProgress::NotStarted,
        };
    }

    pub fn get_progress_percentage(&self) -> f32 {
        match &self.progress {
            ActionProgress::Uploading { fraction, .. } => *fraction as f32,
            ActionProgress::Completed { .. } => 1.0,
            _ => 0.0,
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Scanning => "Scanning dropped items...".to_string(),
            ActionProgress::Uploading { batch, .. } => {
                format!("Uploading batch {}...", batch + 1)
            }
            ActionProgress::Completed { files, batches } => {
                format!("✅ Uploaded {} file(s) in {} batch(es)", files, batches)
            }
            ActionProgress::NothingToUpload => "No files to upload".to_string(),
            ActionProgress::Cancelled => "⏩ Upload cancelled".to_string(),
            ActionProgress::Failed => "❌ Upload failed".to_string(),
        }
    }
}
