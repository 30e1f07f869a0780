//! Artifact storage on local disk
//!
//! Each request gets a [`Workspace`]: the directory the download is written
//! into and the normalizer runs in. With unique workspaces (the default) the
//! directory is `<artifact_dir>/<request-id>/`, otherwise every request shares
//! `<artifact_dir>/` and the last write wins. Nothing here deletes files.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::request_id::RequestId;

pub struct ArtifactStore {
    root: PathBuf,
    input_name: String,
    output_name: String,
    unique_per_request: bool,
}

/// Directory and file names used by one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    dir: PathBuf,
    input_name: String,
    output_name: String,
}

impl ArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.artifact_dir.clone(),
            input_name: config.input_file_name.clone(),
            output_name: config.output_file_name.clone(),
            unique_per_request: config.unique_per_request,
        }
    }

    pub fn workspace_for(&self, request_id: &RequestId) -> Workspace {
        let dir = if self.unique_per_request {
            self.root.join(request_id.to_string())
        } else {
            self.root.clone()
        };
        Workspace {
            dir,
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
        }
    }
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bare input file name, relative to [`Workspace::dir`]
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Bare output file name, relative to [`Workspace::dir`]
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(&self.input_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.output_name)
    }

    /// Create the workspace directory and any missing parents.
    /// Succeeds when it already exists.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write the downloaded bytes, truncating whatever was there before.
    /// Not atomic: a crash mid-write leaves a partial file behind.
    pub async fn write_input(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.input_path();
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path, unique: bool) -> ArtifactStore {
        ArtifactStore::new(&StorageConfig {
            artifact_dir: root.to_path_buf(),
            input_file_name: "downloaded.pdf".to_string(),
            output_file_name: "normed.pdf".to_string(),
            unique_per_request: unique,
        })
    }

    #[test]
    fn test_unique_workspaces_differ() {
        let store = store(Path::new("build"), true);
        let a = store.workspace_for(&RequestId::new());
        let b = store.workspace_for(&RequestId::new());
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().starts_with("build"));
        assert_eq!(a.input_name(), "downloaded.pdf");
        assert_eq!(a.output_path(), a.dir().join("normed.pdf"));
    }

    #[test]
    fn test_shared_workspace_is_root() {
        let store = store(Path::new("build"), false);
        let ws = store.workspace_for(&RequestId::new());
        assert_eq!(ws.dir(), Path::new("build"));
        assert_eq!(ws.input_path(), PathBuf::from("build/downloaded.pdf"));
        assert_eq!(ws, store.workspace_for(&RequestId::new()));
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp.path().join("nested/build"), true);
        let ws = store.workspace_for(&RequestId::new());

        ws.prepare().await.unwrap();
        ws.prepare().await.unwrap();
        assert!(ws.dir().is_dir());
    }

    #[tokio::test]
    async fn test_write_input_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), false);
        let ws = store.workspace_for(&RequestId::new());
        ws.prepare().await.unwrap();

        ws.write_input(b"%PDF-1.4 first, longer body").await.unwrap();
        let path = ws.write_input(b"%PDF-1.4 second").await.unwrap();

        assert_eq!(path, tmp.path().join("downloaded.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 second");
    }

    #[tokio::test]
    async fn test_write_without_prepare_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp.path().join("absent"), true);
        let ws = store.workspace_for(&RequestId::new());
        assert!(ws.write_input(b"data").await.is_err());
    }
}
