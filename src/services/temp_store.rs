use crate::utils::validation::sanitize_filename;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory holding transient uploads and converted artifacts.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the directory if it is missing.
    pub async fn ensure_exists(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a new per-request workspace with a collision-free id.
    pub fn workspace(&self) -> RequestFiles {
        RequestFiles {
            root: self.root.clone(),
            request_id: Uuid::new_v4().simple().to_string(),
            tracked: Vec::new(),
        }
    }

    /// Checks that the directory exists and accepts writes.
    pub async fn is_writable(&self) -> bool {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }
}

/// Files owned by a single request.
///
/// Every path handed out or registered here is removed when the value drops,
/// whether the request finished, failed or unwound.
#[derive(Debug)]
pub struct RequestFiles {
    root: PathBuf,
    request_id: String,
    tracked: Vec<PathBuf>,
}

impl RequestFiles {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// `<root>/<request-id>.<extension>`
    pub fn path_with_extension(&mut self, extension: &str) -> PathBuf {
        let path = self
            .root
            .join(format!("{}.{}", self.request_id, extension));
        self.track(path.clone());
        path
    }

    /// `<root>/<request-id>_<sanitized name>`
    pub fn path_for_upload(&mut self, original_filename: &str) -> PathBuf {
        let path = self.root.join(format!(
            "{}_{}",
            self.request_id,
            sanitize_filename(original_filename)
        ));
        self.track(path.clone());
        path
    }

    /// Writes `data` to a fresh tracked file.
    pub async fn write(&mut self, path: PathBuf, data: &[u8]) -> io::Result<PathBuf> {
        self.track(path.clone());
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Registers a file produced by someone else (e.g. an external tool).
    pub fn track(&mut self, path: PathBuf) {
        if !self.tracked.contains(&path) {
            self.tracked.push(path);
        }
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }
}

impl Drop for RequestFiles {
    fn drop(&mut self) {
        for path in self.tracked.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed temp file {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove temp file {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workspace_removes_files_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempStore::new(dir.path());

        let written = {
            let mut files = store.workspace();
            let input = files.path_with_extension("xlsx");
            let written = files.write(input, b"cells").await.unwrap();
            assert!(written.exists());
            // tracked but never created
            files.path_with_extension("pdf");
            written
        };

        assert!(!written.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspaces_never_share_names() {
        let store = TempStore::new("/tmp/unused");
        let mut a = store.workspace();
        let mut b = store.workspace();
        assert_ne!(a.request_id(), b.request_id());
        assert_ne!(a.path_with_extension("xlsx"), b.path_with_extension("xlsx"));
    }

    #[test]
    fn test_upload_path_keeps_sanitized_name() {
        let store = TempStore::new("/data/tmp");
        let mut files = store.workspace();
        let path = files.path_for_upload("../Mail: Q3.msg");
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(path.parent().unwrap(), Path::new("/data/tmp"));
        assert_eq!(name, format!("{}_Mail_ Q3.msg", files.request_id()));
        assert_eq!(files.tracked().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempStore::new(dir.path().join("a").join("b"));
        assert!(!store.is_writable().await);
        store.ensure_exists().await.unwrap();
        assert!(store.is_writable().await);
    }
}
