//! Directory-tree backend.
//!
//! Each key maps onto nested directories with the content in a fixed file:
//!
//! ```text
//! <root>/<owner>/<name>/<version>/init.txt
//! ```
//!
//! Each write goes to a uniquely named temporary file in the version
//! directory and is then persisted over `init.txt`, so a reader never
//! observes a half-written file and concurrent writers never share a
//! temporary path.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::keyspace::PackageKey;
use crate::storage::PackageStore;

/// Name of the file holding a version's content.
pub const CONTENT_FILE: &str = "init.txt";

/// Filesystem-backed [`PackageStore`].
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
            info!(root = %root.display(), "Created package storage directory");
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn content_path(&self, key: &str) -> AppResult<PathBuf> {
        let key = PackageKey::parse(key).ok_or_else(|| {
            AppError::InternalError(format!("malformed storage key '{}'", key))
        })?;
        let mut path = self.root.clone();
        for segment in key.segments() {
            path.push(segment);
        }
        path.push(CONTENT_FILE);
        Ok(path)
    }
}

/// Names of the directories directly under `dir`, in `read_dir` order.
async fn subdirectories(dir: &Path) -> AppResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(entry = ?raw, "Skipping non UTF-8 directory name"),
        }
    }
    Ok(names)
}

/// Write `content` to a unique temporary file in `dir`, then move it over `target`.
fn write_atomically(dir: &Path, target: &Path, content: &[u8]) -> AppResult<()> {
    let mut temp_file = tempfile::Builder::new()
        .prefix("init-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(target).map_err(|e| {
        warn!(path = %target.display(), error = %e.error, "Failed to move package content into place");
        AppError::Io(e.error)
    })?;
    Ok(())
}

#[async_trait]
impl PackageStore for FileSystemStore {
    fn backend(&self) -> &'static str {
        "filesystem"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.content_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, content: &str) -> AppResult<()> {
        let path = self.content_path(key)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::InternalError(format!("no parent for {}", path.display())))?;

        fs::create_dir_all(&parent).await?;

        let target = path.clone();
        let bytes = content.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&parent, &target, &bytes))
            .await
            .map_err(|e| AppError::InternalError(format!("write task failed: {}", e)))??;

        debug!(path = %path.display(), size = content.len(), "Package content written");
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        let mut keys = Vec::new();
        for owner in subdirectories(&self.root).await? {
            let owner_dir = self.root.join(&owner);
            for name in subdirectories(&owner_dir).await? {
                let name_dir = owner_dir.join(&name);
                for version in subdirectories(&name_dir).await? {
                    let key = format!("{}/{}/{}", owner, name, version);
                    if PackageKey::parse(&key).is_none() {
                        debug!(key = %key, "Skipping directory that is not a package key");
                        continue;
                    }
                    if fs::try_exists(name_dir.join(&version).join(CONTENT_FILE)).await? {
                        keys.push(key);
                    }
                }
            }
        }
        Ok(keys)
    }
}
