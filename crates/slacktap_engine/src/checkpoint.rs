//! Checkpoint stores.
//!
//! A checkpoint store holds the position of every resource partition. The
//! engine only calls [`CheckpointStore::set`] after the records of a page
//! reached the sink and the sink was flushed: positions never run ahead of
//! emitted records.
//!
//! The file-backed store keeps its state next to a lock file:
//!
//! ```text
//! <dir>/
//! ├─ state.json        # StateDocument
//! ├─ state.json.lock   # Advisory lock for single-writer
//! └─ state.json.tmp    # Temporary file for atomic writes
//! ```

use crate::error::{SyncError, SyncResult};
use fs2::FileExt;
use parking_lot::RwLock;
use slacktap_protocol::{Context, PartitionState, StateDocument};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage of partition positions.
pub trait CheckpointStore: Send + Sync {
    /// Returns the position of a partition.
    fn get(&self, resource: &str, context: &Context) -> Option<PartitionState>;

    /// Replaces the position of a partition.
    fn set(&self, resource: &str, context: &Context, state: PartitionState) -> SyncResult<()>;

    /// Marks a partition's position safe to start the next run from.
    fn finalize(&self, resource: &str, context: &Context) -> SyncResult<()>;

    /// Returns a copy of the whole state.
    fn snapshot(&self) -> StateDocument;

    /// Durably writes the state. Idempotent.
    fn persist(&self) -> SyncResult<()>;
}

/// In-memory store; `persist` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: RwLock<StateDocument>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store starting from `state`.
    pub fn with_state(state: StateDocument) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, resource: &str, context: &Context) -> Option<PartitionState> {
        self.state.read().get(resource, context).cloned()
    }

    fn set(&self, resource: &str, context: &Context, state: PartitionState) -> SyncResult<()> {
        self.state.write().set(resource, context, state);
        Ok(())
    }

    fn finalize(&self, resource: &str, context: &Context) -> SyncResult<()> {
        self.state.write().entry(resource, context).finalized = true;
        Ok(())
    }

    fn snapshot(&self) -> StateDocument {
        self.state.read().clone()
    }

    fn persist(&self) -> SyncResult<()> {
        Ok(())
    }
}

/// JSON-file store with atomic writes and an exclusive lock.
///
/// Only one `FileCheckpointStore` can exist per state file at a time; the
/// lock is held until the store is dropped.
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    state: RwLock<StateDocument>,
    _lock_file: File,
}

impl FileCheckpointStore {
    /// Opens the state file at `path`, creating an empty state if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - another process holds the lock ([`SyncError::CheckpointLocked`])
    /// - the existing file is not a valid state document
    /// - I/O errors occur
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(sibling(&path, "lock"))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(SyncError::CheckpointLocked);
        }

        let state = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => StateDocument::new(),
            Ok(text) => StateDocument::from_json(&text)
                .map_err(|e| SyncError::Checkpoint(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateDocument::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
            _lock_file: lock_file,
        })
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Syncs the containing directory so the rename is durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> SyncResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> SyncResult<()> {
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get(&self, resource: &str, context: &Context) -> Option<PartitionState> {
        self.state.read().get(resource, context).cloned()
    }

    fn set(&self, resource: &str, context: &Context, state: PartitionState) -> SyncResult<()> {
        self.state.write().set(resource, context, state);
        Ok(())
    }

    fn finalize(&self, resource: &str, context: &Context) -> SyncResult<()> {
        self.state.write().entry(resource, context).finalized = true;
        Ok(())
    }

    fn snapshot(&self) -> StateDocument {
        self.state.read().clone()
    }

    /// Write temp file, fsync it, rename over the state file, fsync the directory.
    fn persist(&self) -> SyncResult<()> {
        let data = self.state.read().to_json_pretty()?;
        let temp_path = sibling(&self.path, "tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_directory()?;
        debug!(path = %self.path.display(), bytes = data.len(), "persisted state");
        Ok(())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
