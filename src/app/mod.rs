mod state;
mod ui;

use std::path::PathBuf;
use std::sync::mpsc::{self as std_mpsc, Sender};
use std::sync::Arc;

use batch_uploader::config::UploaderConfig;
use batch_uploader::upload::hooks::{Decision, Hooks, Registry};
use batch_uploader::upload::intake;
use batch_uploader::upload::scanner::ScanEntry;
use batch_uploader::upload::transport::{FormFields, HttpTransport};
use batch_uploader::upload::{FileHandle, SubmissionController, SubmissionOutcome};
use eframe::{egui, App};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tracing::{error, info, warn};

pub use state::{ActionProgress, UploadState, WorkerEvent};

/// What the user handed us, before any submission starts.
enum Selection {
    Files(Vec<FileHandle>),
    Dropped(Vec<ScanEntry>),
}

pub struct UploaderApp {
    config: UploaderConfig,
    endpoint: String,
    state: UploadState,
}

impl UploaderApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: UploaderConfig) -> Self {
        info!("initializing uploader for {}", config.endpoint);
        Self {
            endpoint: config.endpoint.clone(),
            config,
            state: UploadState::default(),
        }
    }

    pub fn reset_upload_state(&mut self) {
        self.state.clear();
    }

    pub fn pick_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new().pick_files() else {
            return;
        };
        match intake::files_from_paths(&paths) {
            Ok(files) => self.start(Selection::Files(files)),
            Err(e) => {
                warn!(error = %e, "could not read picked files");
                self.state.error_message = Some(format!("Could not read selected files: {}", e));
            }
        }
    }

    pub fn pick_folder(&mut self) {
        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
            let files = intake::files_from_folder(&folder);
            self.start(Selection::Files(files));
        }
    }

    fn handle_drop(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() || self.state.is_uploading {
            return;
        }

        let mut roots = Vec::with_capacity(dropped.len());
        for path in &dropped {
            match ScanEntry::from_dropped_path(path) {
                Ok(entry) => roots.push(entry),
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring dropped item"),
            }
        }
        self.start(Selection::Dropped(roots));
    }

    fn start(&mut self, selection: Selection) {
        if self.state.is_uploading {
            return;
        }

        let mut config = self.config.clone();
        config.endpoint = self.endpoint.trim().to_string();
        let method = match config.http_method() {
            Ok(method) => method,
            Err(e) => {
                self.state.error_message = Some(e.to_string());
                return;
            }
        };
        let registry = default_registry();

        let (sender, receiver) = std_mpsc::channel();
        let hooks = match Hooks::resolve(&config, &registry) {
            Ok(hooks) => with_event_sinks(hooks, &sender),
            Err(e) => {
                error!(error = %e, "invalid configuration");
                self.state.error_message = Some(e.to_string());
                return;
            }
        };
        self.state.begin(receiver);

        let transport = Arc::new(HttpTransport::new(config.endpoint.clone(), method));
        let options = config.submission_options();

        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "failed to start upload runtime");
                    let _ = sender.send(WorkerEvent::Finished(SubmissionOutcome::Ignored));
                    return;
                }
            };
            let outcome = runtime.block_on(async move {
                let mut controller = SubmissionController::new(transport, options, hooks);
                match selection {
                    Selection::Files(files) => controller.submit_files(files).await,
                    Selection::Dropped(roots) => controller.submit_drop(roots).await,
                }
            });
            info!(success = outcome.is_success(), "submission finished");
            let _ = sender.send(WorkerEvent::Finished(outcome));
        });
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        let mut events = Vec::new();
        if let Some(receiver) = &self.state.receiver {
            while let Ok(event) = receiver.try_recv() {
                events.push(event);
            }
        }
        let had_updates = !events.is_empty();
        for event in events {
            self.state.apply(event);
        }

        if had_updates || self.state.is_uploading {
            ctx.request_repaint();
        }
    }
}

/// Capabilities the desktop app offers to configuration by name.
fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_before("confirm", |_fields: &mut FormFields| {
        let answer = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title("Upload files")
            .set_description("Start uploading the selected files?")
            .set_buttons(MessageButtons::OkCancel)
            .show();
        match answer {
            MessageDialogResult::Ok | MessageDialogResult::Yes => Decision::Proceed,
            _ => Decision::Abort,
        }
    });
    registry
}

fn with_event_sinks(hooks: Hooks, sender: &Sender<WorkerEvent>) -> Hooks {
    let progress = sender.clone();
    let states = sender.clone();
    hooks
        .with_progress(move |fraction| {
            let _ = progress.send(WorkerEvent::Progress(fraction));
        })
        .with_state_listener(move |state| {
            let _ = states.send(WorkerEvent::State(state));
        })
}

impl App for UploaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drop(ctx);
        self.update_state(ctx);
        self.render(ctx);
    }
}
