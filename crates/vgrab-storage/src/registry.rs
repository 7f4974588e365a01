//! File registry.
//!
//! Maps file ids to metadata for artifacts in the output directory. The
//! index is dumped to `index.json` next to the artifacts after every
//! upsert so it survives restarts. Entries whose backing file has
//! disappeared are reported as misses but left in the index.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use vgrab_models::FileMetadata;

use crate::error::{StorageError, StorageResult};

/// Name of the index file inside the output directory.
pub const INDEX_FILENAME: &str = "index.json";

/// Durable artifact index.
#[derive(Clone)]
pub struct FileRegistry {
    root: PathBuf,
    entries: Arc<RwLock<HashMap<String, FileMetadata>>>,
}

impl FileRegistry {
    /// Open the registry rooted at `output_dir`, creating the directory and
    /// loading any existing index.
    pub async fn open(output_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = output_dir.into();
        tokio::fs::create_dir_all(&root).await?;

        let index_path = root.join(INDEX_FILENAME);
        let entries = match tokio::fs::read(&index_path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, FileMetadata>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "Corrupt registry index, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(root = %root.display(), entries = entries.len(), "Opened file registry");

        Ok(Self {
            root,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Directory holding the artifacts and the index.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upsert metadata keyed by `file_id` and persist the index.
    pub async fn register(&self, meta: FileMetadata) -> StorageResult<()> {
        let mut entries = self.entries.write().await;

        if let Some(previous) = entries.get(&meta.file_id) {
            // Two jobs for the same source video share an output name.
            warn!(
                file_id = %meta.file_id,
                previous_size = previous.size,
                size = meta.size,
                "Replacing existing registry entry"
            );
        }

        debug!(file_id = %meta.file_id, content_type = %meta.content_type, size = meta.size, "Registering file");
        entries.insert(meta.file_id.clone(), meta);

        // Persist while holding the write lock so dumps are never reordered.
        self.persist(&entries).await
    }

    /// Stat a file in the output directory and register it under its name.
    pub async fn register_file(
        &self,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<FileMetadata> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::invalid_key(path.display().to_string()))?;

        let size = tokio::fs::metadata(path).await?.len();
        let meta = FileMetadata::new(filename, content_type, size);
        self.register(meta.clone()).await?;
        Ok(meta)
    }

    /// Metadata for `file_id`, only if its file still exists.
    pub async fn lookup(&self, file_id: &str) -> Option<FileMetadata> {
        let meta = self.entries.read().await.get(file_id).cloned()?;
        let path = self.resolve_path(&meta.filename).ok()?;

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(meta),
            _ => {
                debug!(file_id = %file_id, "Registry entry has no backing file");
                None
            }
        }
    }

    /// Absolute path of `filename` inside the output directory.
    ///
    /// Only plain names are accepted; separators and `..` are rejected.
    pub fn resolve_path(&self, filename: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name != INDEX_FILENAME => {
                Ok(self.root.join(name))
            }
            _ => Err(StorageError::invalid_key(filename)),
        }
    }

    /// Number of indexed entries, live or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn persist(&self, entries: &HashMap<String, FileMetadata>) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let index_path = self.root.join(INDEX_FILENAME);
        let tmp_path = self.root.join(format!("{}.tmp", INDEX_FILENAME));

        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| StorageError::persist_failed(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &index_path)
            .await
            .map_err(|e| StorageError::persist_failed(e.to_string()))?;

        Ok(())
    }
}
