mod controller;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod intake;
pub mod path;
pub mod progress;
pub mod queue;
pub mod scanner;
pub mod transport;
mod types;

pub use controller::{SubmissionController, SubmissionOptions};
pub use types::{Batch, FileHandle, SubmissionOutcome, SubmissionState};
