use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use coldroom_common::identity::UserRecord;

/// Where the session record lives between runs.
pub trait SessionStore {
    /// The stored record, or `None` if nothing usable is stored.
    fn load(&self) -> Option<UserRecord>;

    fn save(&mut self, record: &UserRecord) -> io::Result<()>;

    fn clear(&mut self) -> io::Result<()>;
}

/// In-process store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Option<UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<UserRecord> {
        self.record.clone()
    }

    fn save(&mut self, record: &UserRecord) -> io::Result<()> {
        self.record = Some(record.clone());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.record = None;
        Ok(())
    }
}

/// JSON file holding the flat record.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// `~/.cache/coldroom/session.json`, or `/tmp` when there is no cache dir.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("coldroom")
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Option<UserRecord> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable session file: {e}");
                None
            }
        }
    }

    fn save(&mut self, record: &UserRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&self.path, bytes)
    }

    fn clear(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
