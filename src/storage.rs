use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Logical name holding the serialized cache snapshot
pub const CACHE_BLOB: &str = "ailang_cache";

/// Logical name holding the persisted language code
pub const LANGUAGE_BLOB: &str = "ailang_language";

/// Opaque named-blob storage.
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` if it was never written or has been removed.
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Write (or overwrite) a blob.
    fn set(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Remove a blob. Removing a missing blob is not an error.
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs().get(name).cloned())
    }

    fn set(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        self.blobs().remove(name);
        Ok(())
    }
}

/// Directory-backed blob store, one file per blob name.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !name.starts_with('.');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name: {:?}", name),
            ));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

impl BlobStore for FileStore {
    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(name)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(name)?;
        // Atomic replace via a sibling temp file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
