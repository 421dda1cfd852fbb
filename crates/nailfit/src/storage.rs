//! Session-scoped artifact storage.
//!
//! Every session writes under its own key space, so concurrent sessions never
//! collide. The pipeline only talks to [`SessionStorage`]; the filesystem and
//! in-memory backends are interchangeable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::session::SessionId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("no artifact '{key}' in session '{session}'")]
    NotFound { session: String, key: String },
    #[error("storage I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored document '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Opaque handle to a stored artifact (a filesystem path or an in-memory URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage addressed by session id + key.
pub trait SessionStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, session: &SessionId, key: &str, bytes: &[u8])
        -> Result<ArtifactRef, StorageError>;
    /// Read the bytes stored under `key`.
    fn get(&self, session: &SessionId, key: &str) -> Result<Vec<u8>, StorageError>;
    /// Keys present for a session, sorted. Unknown sessions yield an empty list.
    fn list(&self, session: &SessionId) -> Result<Vec<String>, StorageError>;
    /// Delete `key`; removing a missing key is not an error.
    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StorageError>;
}

/// Keys are flat file names: no separators, no parent references.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let ok = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Filesystem backend: `<root>/<session>/<key>`.
#[derive(Debug, Clone)]
pub struct FsSessionStorage {
    root: PathBuf,
}

impl FsSessionStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session's artifacts.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.as_str())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl SessionStorage for FsSessionStorage {
    fn put(
        &self,
        session: &SessionId,
        key: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError> {
        validate_key(key)?;
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let path = dir.join(key);
        std::fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;
        Ok(ArtifactRef::new(path.display().to_string()))
    }

    fn get(&self, session: &SessionId, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let path = self.session_dir(session).join(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                session: session.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn list(&self, session: &SessionId) -> Result<Vec<String>, StorageError> {
        let dir = self.session_dir(session);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&dir, e)),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            if entry.path().is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.session_dir(session).join(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

/// In-memory backend, used for tests and for embedding without a disk.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn put(
        &self,
        session: &SessionId,
        key: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError> {
        validate_key(key)?;
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert((session.to_string(), key.to_string()), bytes.to_vec());
        Ok(ArtifactRef::new(format!("mem://{session}/{key}")))
    }

    fn get(&self, session: &SessionId, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries
            .get(&(session.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                session: session.to_string(),
                key: key.to_string(),
            })
    }

    fn list(&self, session: &SessionId) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries
            .keys()
            .filter(|(s, _)| s == session.as_str())
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(&(session.to_string(), key.to_string()));
        Ok(())
    }
}

/// Delete every key of `session`.
pub(crate) fn clear_session(
    storage: &dyn SessionStorage,
    session: &SessionId,
) -> Result<usize, StorageError> {
    let keys = storage.list(session)?;
    for key in &keys {
        storage.remove(session, key)?;
    }
    Ok(keys.len())
}

/// Store a value as pretty JSON.
pub(crate) fn put_json<T: serde::Serialize>(
    storage: &dyn SessionStorage,
    session: &SessionId,
    key: &str,
    value: &T,
) -> Result<ArtifactRef, StorageError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Malformed {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    storage.put(session, key, &json)
}

/// Load a JSON document stored with [`put_json`].
pub(crate) fn get_json<T: serde::de::DeserializeOwned>(
    storage: &dyn SessionStorage,
    session: &SessionId,
    key: &str,
) -> Result<T, StorageError> {
    let bytes = storage.get(session, key)?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Malformed {
        key: key.to_string(),
        message: e.to_string(),
    })
}
