use glob::Pattern;
use tracing::debug;

use crate::upload::error::ConfigError;
use crate::upload::FileHandle;

/// Decides whether a candidate file enters the upload queue, optionally
/// replacing it. Returning `None` drops the file.
pub trait FileFilter: Send + Sync {
    fn filter(&self, file: FileHandle) -> Option<FileHandle>;
}

impl<F> FileFilter for F
where
    F: Fn(FileHandle) -> Option<FileHandle> + Send + Sync,
{
    fn filter(&self, file: FileHandle) -> Option<FileHandle> {
        self(file)
    }
}

/// Rejects files whose relative path matches any of the exclude globs.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    patterns: Vec<Pattern>,
}

impl PatternFilter {
    pub fn new<S: AsRef<str>>(excludes: &[S]) -> Result<Self, ConfigError> {
        let mut patterns = Vec::with_capacity(excludes.len());
        for raw in excludes {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            // Unanchored patterns match at any depth.
            let anchored = if raw.starts_with("**/") {
                raw.to_string()
            } else {
                format!("**/{}", raw)
            };
            let pattern = Pattern::new(&anchored).map_err(|source| ConfigError::Pattern {
                pattern: raw.to_string(),
                source,
            })?;
            patterns.push(pattern);
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn is_excluded(&self, file: &FileHandle) -> bool {
        let path = file.full_path.trim_start_matches('/').replace('\\', "/");
        let candidate = if path.is_empty() { file.name.as_str() } else { path.as_str() };
        self.patterns.iter().any(|p| p.matches(candidate))
    }
}

impl FileFilter for PatternFilter {
    fn filter(&self, file: FileHandle) -> Option<FileHandle> {
        if self.is_excluded(&file) {
            debug!(path = %file.full_path, "excluded by pattern");
            None
        } else {
            Some(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(full_path: &str) -> FileHandle {
        let name = full_path.rsplit('/').next().unwrap_or_default();
        FileHandle::new(name, 1, full_path, full_path)
    }

    #[test]
    fn excludes_at_any_depth() {
        let filter = PatternFilter::new(&[".DS_Store", "*.tmp"]).unwrap();
        assert!(filter.filter(file("/photos/.DS_Store")).is_none());
        assert!(filter.filter(file("photos/2021/scratch.tmp")).is_none());
        assert!(filter.filter(file("/photos/a.jpg")).is_some());
    }

    #[test]
    fn falls_back_to_name_without_path() {
        let filter = PatternFilter::new(&["*.log"]).unwrap();
        let mut f = file("");
        f.name = "debug.log".into();
        assert!(filter.filter(f).is_none());
    }

    #[test]
    fn rejects_bad_pattern() {
        assert!(matches!(
            PatternFilter::new(&["[unclosed"]),
            Err(ConfigError::Pattern { .. })
        ));
    }

    #[test]
    fn closures_are_filters() {
        let rename = |mut f: FileHandle| {
            f.name = f.name.to_uppercase();
            Some(f)
        };
        let out = rename.filter(file("a/b.txt")).unwrap();
        assert_eq!(out.name, "B.TXT");
    }
}
