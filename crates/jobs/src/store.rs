//! File-per-job output store.
//!
//! Layout: `<root>/<id>.txt`. Writes go through a temp file in `<root>` and
//! are renamed into place, so readers see either the old record or the new
//! one, never a partial write.

use settings::constants::jobs::MAX_ID_LENGTH;
use std::io::Write;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "txt";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown id: {0}")]
    NotFound(String),

    #[error("invalid job id: {0:?}")]
    InvalidId(String),

    #[error("job store I/O for {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Whether `id` can name a record: 1..=64 chars of `[A-Za-z0-9_.-]`, not
/// starting with `.`.
pub fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && !id.starts_with('.')
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// Durable `id -> captured output` mapping.
#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::debug!("Job store at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_job_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, RECORD_EXTENSION)))
    }

    /// Persist `text` under `id`, replacing any earlier record.
    pub fn write(&self, id: &str, text: &str) -> Result<(), StoreError> {
        let path = self.record_path(id)?;
        let io_err = |source| StoreError::Io {
            id: id.to_string(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".job-")
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        tracing::trace!(job_id = %id, bytes = text.len(), "Stored job output");
        Ok(())
    }

    /// [`JobStore::write`] on the blocking pool, for use from async handlers.
    pub async fn save(&self, id: &str, text: String) -> Result<(), StoreError> {
        let store = self.clone();
        let owned_id = id.to_string();
        tokio::task::spawn_blocking(move || store.write(&owned_id, &text))
            .await
            .map_err(|e| StoreError::Io {
                id: id.to_string(),
                source: std::io::Error::other(e),
            })?
    }

    /// Full stored text for `id`.
    pub fn read(&self, id: &str) -> Result<String, StoreError> {
        let path = self.record_path(id)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                id: id.to_string(),
                source,
            }),
        }
    }

    /// Last `n` lines of the stored text for `id`.
    pub fn read_tail(&self, id: &str, n: usize) -> Result<String, StoreError> {
        let text = self.read(id)?;
        Ok(util::tail_lines(&text, n))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.record_path(id).map(|p| p.is_file()).unwrap_or(false)
    }
}
