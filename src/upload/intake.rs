use std::io;
use std::path::{Path, PathBuf};

use ignore::Walk;
use tracing::{debug, warn};

use crate::upload::FileHandle;

/// Files picked one by one carry no relative path.
pub fn files_from_paths(paths: &[PathBuf]) -> io::Result<Vec<FileHandle>> {
    paths
        .iter()
        .map(|path| {
            let metadata = std::fs::metadata(path)?;
            Ok(FileHandle::new(file_name(path), metadata.len(), "", path.clone()))
        })
        .collect()
}

/// Every file under a picked folder, skipping what `.gitignore` excludes.
///
/// Relative paths start with the folder's own name, e.g. `photos/2021/a.jpg`.
pub fn files_from_folder(root: &Path) -> Vec<FileHandle> {
    let root_name = file_name(root);
    let mut files = Vec::new();

    for entry in Walk::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map_or(false, |t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file without metadata");
                continue;
            }
        };
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push(FileHandle::new(
            file_name(path),
            size,
            format!("{}/{}", root_name, relative),
            path.to_path_buf(),
        ));
    }

    // Walk order depends on the platform; keep the queue predictable.
    files.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    debug!(folder = %root.display(), files = files.len(), "folder selected");
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
