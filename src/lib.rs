//! Batched multipart uploads of picked or dropped files.
//!
//! Files are collected from a picker or a drop (dropped folders are scanned
//! recursively), queued, split into batches under a byte and a file-count
//! ceiling, and sent one batch at a time while overall progress is reported.
pub mod config;
pub mod upload;
pub mod utils;
