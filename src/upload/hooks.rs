//! Caller-supplied capabilities for a submission.
//!
//! Configuration refers to filters and callbacks by name; a [`Registry`]
//! maps those names to values once, when the controller is built.

use std::collections::HashMap;
use std::sync::Arc;

use derivative::Derivative;
use serde_json::Value;

use crate::config::UploaderConfig;
use crate::upload::error::ConfigError;
use crate::upload::filter::{FileFilter, PatternFilter};
use crate::upload::transport::FormFields;
use crate::upload::{FileHandle, SubmissionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

/// Runs before anything is queued. May add per-submission form fields.
pub trait BeforeSubmit: Send + Sync {
    fn before(&self, fields: &mut FormFields) -> Decision;
}

impl<F> BeforeSubmit for F
where
    F: Fn(&mut FormFields) -> Decision + Send + Sync,
{
    fn before(&self, fields: &mut FormFields) -> Decision {
        self(fields)
    }
}

/// Called exactly once when a started submission ends: with the last batch
/// and its response on success, with `(None, None)` otherwise.
pub type TerminalCallback = Box<dyn FnMut(Option<&[FileHandle]>, Option<&Value>) + Send>;
/// Receives overall completion in `[0, 1]`.
pub type ProgressSink = Box<dyn FnMut(f64) + Send>;
pub type StateListener = Box<dyn FnMut(SubmissionState) + Send>;

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct Hooks {
    #[derivative(Debug = "ignore")]
    pub before: Option<Arc<dyn BeforeSubmit>>,
    #[derivative(Debug = "ignore")]
    pub filter: Option<Arc<dyn FileFilter>>,
    #[derivative(Debug = "ignore")]
    pub on_terminal: Option<TerminalCallback>,
    #[derivative(Debug = "ignore")]
    pub on_progress: Option<ProgressSink>,
    #[derivative(Debug = "ignore")]
    pub on_state: Option<StateListener>,
}

impl Hooks {
    /// Resolves the capabilities named in `config` against `registry`.
    ///
    /// Exclude patterns in the config become a [`PatternFilter`] when no
    /// named filter is set, and are applied after it otherwise.
    pub fn resolve(config: &UploaderConfig, registry: &Registry) -> Result<Self, ConfigError> {
        let named_filter = config
            .filter
            .as_deref()
            .map(|name| registry.filter(name))
            .transpose()?;
        let patterns = PatternFilter::new(&config.exclude)?;

        let filter: Option<Arc<dyn FileFilter>> = match (named_filter, patterns.is_empty()) {
            (None, true) => None,
            (None, false) => Some(Arc::new(patterns)),
            (Some(named), true) => Some(named),
            (Some(named), false) => Some(Arc::new(move |file: FileHandle| {
                named.filter(file).and_then(|f| patterns.filter(f))
            })),
        };

        let before = config
            .before_upload
            .as_deref()
            .map(|name| registry.before(name))
            .transpose()?;

        let on_terminal = config
            .callback
            .as_deref()
            .map(|name| registry.take_terminal(name))
            .transpose()?;

        Ok(Self {
            before,
            filter,
            on_terminal,
            on_progress: None,
            on_state: None,
        })
    }

    pub fn with_progress(mut self, sink: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(sink));
        self
    }

    pub fn with_state_listener(mut self, listener: impl FnMut(SubmissionState) + Send + 'static) -> Self {
        self.on_state = Some(Box::new(listener));
        self
    }

    pub fn with_terminal(
        mut self,
        callback: impl FnMut(Option<&[FileHandle]>, Option<&Value>) + Send + 'static,
    ) -> Self {
        self.on_terminal = Some(Box::new(callback));
        self
    }
}

/// Named capabilities that configuration may refer to.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct Registry {
    #[derivative(Debug = "ignore")]
    filters: HashMap<String, Arc<dyn FileFilter>>,
    #[derivative(Debug = "ignore")]
    befores: HashMap<String, Arc<dyn BeforeSubmit>>,
    #[derivative(Debug = "ignore")]
    terminals: std::sync::Mutex<HashMap<String, TerminalCallback>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_filter(&mut self, name: impl Into<String>, filter: impl FileFilter + 'static) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn register_before(&mut self, name: impl Into<String>, hook: impl BeforeSubmit + 'static) -> &mut Self {
        self.befores.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn register_terminal(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(Option<&[FileHandle]>, Option<&Value>) + Send + 'static,
    ) -> &mut Self {
        self.terminals
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.into(), Box::new(callback));
        self
    }

    fn filter(&self, name: &str) -> Result<Arc<dyn FileFilter>, ConfigError> {
        self.filters
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("filter", name))
    }

    fn before(&self, name: &str) -> Result<Arc<dyn BeforeSubmit>, ConfigError> {
        self.befores
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("before-upload hook", name))
    }

    /// Terminal callbacks are `FnMut` and owned by one controller at a time.
    fn take_terminal(&self, name: &str) -> Result<TerminalCallback, ConfigError> {
        self.terminals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name)
            .ok_or_else(|| unknown("callback", name))
    }
}

fn unknown(kind: &'static str, name: &str) -> ConfigError {
    ConfigError::UnknownCapability {
        kind,
        name: name.to_string(),
    }
}
