use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::CoreError;

const PREFIX: &str = "stackboot-metadata-";

/// Scratch directory the metadata generator writes into.
///
/// Removed by [`Workspace::release`], or on drop if release is never reached.
pub struct Workspace {
    dir: TempDir,
}

/// Regular file found under a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    pub path: PathBuf,
    /// Workspace-relative path with `/` separators.
    pub object: String,
}

impl Workspace {
    pub fn acquire() -> Result<Self, CoreError> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .map_err(CoreError::Workspace)?;
        debug!(path = %dir.path().display(), "metadata workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory, logging instead of failing.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "metadata workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove metadata workspace"),
        }
    }
}

/// Every regular file below `root`, sorted by object name.
///
/// Directories only shape the object names and are never listed themselves.
/// Symlinks are followed and named after the link.
pub fn collect_files(root: &Path) -> Result<Vec<WorkspaceFile>, CoreError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| CoreError::Workspace(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let object = object_name(root, entry.path())?;
        files.push(WorkspaceFile {
            path: entry.into_path(),
            object,
        });
    }
    files.sort_by(|a, b| a.object.cmp(&b.object));
    Ok(files)
}

fn object_name(root: &Path, path: &Path) -> Result<String, CoreError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        CoreError::Workspace(std::io::Error::other(format!(
            "{} is outside the workspace",
            path.display()
        )))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            CoreError::Workspace(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non UTF-8 file name: {}", relative.display()),
            ))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
