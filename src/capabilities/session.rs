//! Session-scoped key-value store.
//!
//! Values written here outlive the collector instance but not the session
//! that owns the store. The collector writes exactly one key (the summary
//! breaker flag); hosts may clear it to re-enable the guarded dependency.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::CapabilityError;

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CapabilityError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CapabilityError>;
    fn remove(&self, key: &str) -> Result<(), CapabilityError>;
}

/// Process-local store, for hosts whose session is the process itself.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: DashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, CapabilityError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CapabilityError> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CapabilityError> {
        self.inner.remove(key);
        Ok(())
    }
}

/// A JSON object file holding all session keys.
///
/// Every call goes to disk so that edits made by another process (or by an
/// operator deleting the file) are observed immediately.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, CapabilityError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let file = File::open(&self.path).map_err(session_error)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CapabilityError::Session(e.to_string()))
    }

    fn save(&self, map: &HashMap<String, String>) -> Result<(), CapabilityError> {
        let file = File::create(&self.path).map_err(session_error)?;
        serde_json::to_writer(BufWriter::new(file), map)
            .map_err(|e| CapabilityError::Session(e.to_string()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, CapabilityError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CapabilityError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<(), CapabilityError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

fn session_error(e: std::io::Error) -> CapabilityError {
    CapabilityError::Session(e.to_string())
}
