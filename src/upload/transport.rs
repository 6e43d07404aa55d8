use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::upload::error::TransportError;
use crate::upload::path::enclosing_folder;
use crate::upload::{Batch, FileHandle};

/// Extra form fields sent with every batch, each with one or more values.
pub type FormFields = BTreeMap<String, Vec<String>>;

/// `(bytes_sent, bytes_total)` for the batch in flight.
pub type ProgressUpdate = (u64, u64);

/// Everything a transport needs to send one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub batch: Batch,
    pub collision: Option<String>,
    pub data_designation: Option<String>,
    pub label_with_folder: bool,
    pub fields: FormFields,
}

/// One part of the multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEntry<'a> {
    /// Sent under the `file` field name.
    File(&'a FileHandle),
    Text(String, String),
}

impl BatchRequest {
    /// Parts of the form in send order: `collision` and `data_designation`,
    /// then each file followed by its `enclosing_folder` when labelling is
    /// on, then the custom fields.
    pub fn form_entries(&self) -> Vec<FormEntry<'_>> {
        let mut entries = Vec::new();
        if let Some(collision) = &self.collision {
            entries.push(FormEntry::Text("collision".to_string(), collision.clone()));
        }
        if let Some(desig) = &self.data_designation {
            entries.push(FormEntry::Text("data_designation".to_string(), desig.clone()));
        }
        for file in &self.batch.files {
            entries.push(FormEntry::File(file));
            if self.label_with_folder {
                entries.push(FormEntry::Text(
                    "enclosing_folder".to_string(),
                    enclosing_folder(&file.full_path).to_string(),
                ));
            }
        }
        for (name, values) in &self.fields {
            for value in values {
                entries.push(FormEntry::Text(name.clone(), value.clone()));
            }
        }
        entries
    }

    /// Values of every text part called `name`, in form order.
    pub fn text_values(&self, name: &str) -> Vec<String> {
        self.form_entries()
            .into_iter()
            .filter_map(|entry| match entry {
                FormEntry::Text(field, value) if field == name => Some(value),
                _ => None,
            })
            .collect()
    }
}

/// Sends one batch and reports upload progress on `progress`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: BatchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<Value, TransportError>;
}

/// Multipart form upload over HTTP.
///
/// The blocking client is created per batch on a blocking thread, never
/// inside the async runtime.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    method: Method,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, method: Method) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
        }
    }

    fn build_form(
        request: &BatchRequest,
        progress: &UnboundedSender<ProgressUpdate>,
    ) -> Result<Form, TransportError> {
        let total = request.batch.total_bytes();
        let counter = SentCounter {
            sent: Arc::new(AtomicU64::new(0)),
            total,
            progress: progress.clone(),
        };

        let mut form = Form::new();
        for entry in request.form_entries() {
            form = match entry {
                FormEntry::File(file) => {
                    let handle = File::open(&file.location).map_err(|source| TransportError::File {
                        path: file.location.clone(),
                        source,
                    })?;
                    let reader = ProgressReader {
                        inner: handle,
                        counter: counter.clone(),
                    };
                    let part =
                        Part::reader_with_length(reader, file.size).file_name(file.name.clone());
                    form.part("file", part)
                }
                FormEntry::Text(name, value) => form.text(name, value),
            };
        }
        Ok(form)
    }

    fn send_blocking(
        &self,
        request: BatchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<Value, TransportError> {
        let form = Self::build_form(&request, &progress)?;
        debug!(
            endpoint = %self.endpoint,
            files = request.batch.len(),
            bytes = request.batch.total_bytes(),
            "sending batch"
        );

        let response = reqwest::blocking::Client::new()
            .request(self.method.clone(), &self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        info!(status = status.as_u16(), "batch response");
        interpret_response(status.as_u16(), &body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: BatchRequest,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> Result<Value, TransportError> {
        let transport = self.clone();
        tokio::task::spawn_blocking(move || transport.send_blocking(request, progress))
            .await
            .map_err(|e| TransportError::Unknown(format!("upload task failed: {}", e)))?
    }
}

/// Maps a status code and raw body to the batch result.
///
/// A body that is not JSON is treated like a missing response, whatever
/// the status.
pub fn interpret_response(status: u16, body: &str) -> Result<Value, TransportError> {
    let parsed = serde_json::from_str::<Value>(body);
    if (200..300).contains(&status) {
        return parsed.map_err(|e| {
            TransportError::Connection(format!("status {} with unreadable body: {}", status, e))
        });
    }
    match parsed {
        Ok(json) => match json.get("msg").and_then(Value::as_str) {
            Some(message) => Err(TransportError::Server {
                status,
                message: message.to_string(),
            }),
            None => Err(TransportError::Unknown(format!("status {} with {}", status, json))),
        },
        Err(_) => Err(TransportError::Connection(format!("status {}", status))),
    }
}

#[derive(Clone)]
struct SentCounter {
    sent: Arc<AtomicU64>,
    total: u64,
    progress: UnboundedSender<ProgressUpdate>,
}

impl SentCounter {
    fn add(&self, n: usize) {
        let sent = self.sent.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        // The receiver is gone once the controller stopped listening.
        let _ = self.progress.send((sent.min(self.total), self.total));
    }
}

/// Counts bytes as reqwest pulls them from the file.
struct ProgressReader {
    inner: File,
    counter: SentCounter,
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.counter.add(n);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FileHandle;

    #[test]
    fn success_returns_body() {
        let body = interpret_response(200, r#"{"ids":[1,2]}"#).unwrap();
        assert_eq!(body["ids"][1], 2);
    }

    #[test]
    fn structured_error_message() {
        match interpret_response(400, r#"{"msg":"quota exceeded"}"#) {
            Err(TransportError::Server { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_without_msg_is_unknown() {
        assert!(matches!(
            interpret_response(500, r#"{"error":true}"#),
            Err(TransportError::Unknown(_))
        ));
    }

    #[test]
    fn error_without_json_is_connection() {
        assert!(matches!(
            interpret_response(502, "<html>Bad Gateway</html>"),
            Err(TransportError::Connection(_))
        ));
    }

    #[test]
    fn success_with_garbage_is_connection() {
        let err = interpret_response(200, "ok").unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)), "{:?}", err);
        assert_eq!(err.user_message(), crate::upload::error::CONNECTION_MESSAGE);
    }

    fn text(name: &str, value: &str) -> FormEntry<'static> {
        FormEntry::Text(name.to_string(), value.to_string())
    }

    fn labelled_request(files: Vec<FileHandle>) -> BatchRequest {
        let mut fields = FormFields::new();
        fields.insert("tag".into(), vec!["x".into(), "y".into()]);
        BatchRequest {
            batch: Batch { files },
            collision: Some("rename".into()),
            data_designation: Some("raw".into()),
            label_with_folder: true,
            fields,
        }
    }

    #[test]
    fn each_file_is_followed_by_its_folder() {
        let a = FileHandle::new("a.txt", 1, "/trip/day1/a.txt", "a.txt");
        let b = FileHandle::new("b.txt", 1, "b.txt", "b.txt");
        let request = labelled_request(vec![a.clone(), b.clone()]);

        assert_eq!(
            request.form_entries(),
            vec![
                text("collision", "rename"),
                text("data_designation", "raw"),
                FormEntry::File(&a),
                text("enclosing_folder", "day1"),
                FormEntry::File(&b),
                text("enclosing_folder", ""),
                text("tag", "x"),
                text("tag", "y"),
            ]
        );
        assert_eq!(request.text_values("enclosing_folder"), vec!["day1", ""]);
    }

    #[test]
    fn unlabelled_form_has_only_files_and_fields() {
        let a = FileHandle::new("a.txt", 1, "/trip/day1/a.txt", "a.txt");
        let request = BatchRequest {
            batch: Batch { files: vec![a.clone()] },
            ..Default::default()
        };
        assert_eq!(request.form_entries(), vec![FormEntry::File(&a)]);
        assert!(request.text_values("enclosing_folder").is_empty());
    }

    #[test]
    fn form_opens_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.txt");
        std::fs::write(&present, b"abc").unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let ok = labelled_request(vec![FileHandle::new("a.txt", 3, "/trip/a.txt", present.clone())]);
        assert!(HttpTransport::build_form(&ok, &tx).is_ok());

        let missing = dir.path().join("gone.txt");
        let broken = labelled_request(vec![
            FileHandle::new("a.txt", 3, "/trip/a.txt", present.clone()),
            FileHandle::new("gone.txt", 3, "/trip/gone.txt", missing.clone()),
        ]);
        match HttpTransport::build_form(&broken, &tx) {
            Err(TransportError::File { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
