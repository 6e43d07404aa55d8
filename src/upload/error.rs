use std::path::PathBuf;

use thiserror::Error;

pub const CONNECTION_MESSAGE: &str =
    "Upload error. Please verify your internet connection and try again.";
pub const UNKNOWN_MESSAGE: &str = "An unknown error has occurred. Please try again.";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered and said why it refused the batch.
    #[error("server rejected upload ({status}): {message}")]
    Server { status: u16, message: String },

    /// No usable response: network failure, or an error status without a
    /// structured body.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected response: {0}")]
    Unknown(String),

    #[error("failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            Self::Connection(_) => CONNECTION_MESSAGE.to_string(),
            Self::Unknown(_) | Self::File { .. } => UNKNOWN_MESSAGE.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Scan(e) => format!("Could not read dropped files: {}", e),
            Self::Transport(e) => e.user_message(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("no {kind} registered under the name '{name}'")]
    UnknownCapability { kind: &'static str, name: String },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
