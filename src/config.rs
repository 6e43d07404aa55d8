use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::upload::error::ConfigError;
use crate::upload::queue::{BatchLimits, QueueOptions};
use crate::upload::transport::FormFields;
use crate::upload::SubmissionOptions;

pub const CONFIG_ENV: &str = "BATCH_UPLOADER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "uploader.json";

/// A form field given either as a single value or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValues {
    One(String),
    Many(Vec<String>),
}

impl FieldValues {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct UploaderConfig {
    pub endpoint: String,
    pub method: String,
    pub collision: Option<String>,
    pub data_designation: Option<String>,
    pub label_with_folder: bool,
    /// `-1` (or `0`) means no limit.
    pub file_limit: i64,
    pub batch_all: bool,
    pub fields: BTreeMap<String, FieldValues>,
    /// Name of a registered filter.
    pub filter: Option<String>,
    /// Name of a registered before-upload hook.
    pub before_upload: Option<String>,
    /// Name of a registered terminal callback.
    pub callback: Option<String>,
    /// Globs of relative paths that are never uploaded.
    pub exclude: Vec<String>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/upload".to_string(),
            method: "POST".to_string(),
            collision: None,
            data_designation: None,
            label_with_folder: false,
            file_limit: -1,
            batch_all: false,
            fields: BTreeMap::new(),
            filter: None,
            before_upload: None,
            callback: None,
            exclude: Vec::new(),
        }
    }
}

impl UploaderConfig {
    /// Loads from `$BATCH_UPLOADER_CONFIG`, else `uploader.json` in the
    /// working directory. A missing default file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_path(&path)
                } else {
                    debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn http_method(&self) -> Result<Method, ConfigError> {
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|_| ConfigError::InvalidMethod(self.method.clone()))
    }

    pub fn file_limit(&self) -> Option<usize> {
        usize::try_from(self.file_limit).ok().filter(|&n| n > 0)
    }

    pub fn form_fields(&self) -> FormFields {
        self.fields
            .iter()
            .map(|(name, values)| (name.clone(), values.clone().into_vec()))
            .collect()
    }

    pub fn submission_options(&self) -> SubmissionOptions {
        SubmissionOptions {
            collision: self.collision.clone(),
            data_designation: self.data_designation.clone(),
            label_with_folder: self.label_with_folder,
            fields: self.form_fields(),
            queue: QueueOptions {
                file_limit: self.file_limit(),
                batch_all: self.batch_all,
                limits: BatchLimits::default(),
            },
        }
    }
}
