use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::error::Result;
use crate::storage::KeyValueStore;

/// All state in one JSON object on disk. Every write goes to a sibling
/// `.tmp` file that is then renamed over the original, so a crash never
/// leaves a half-written document.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_doc(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_doc(&self, doc: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("State saved to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_doc()?.get(key).cloned())
    }

    fn save_all(&self, entries: Map<String, Value>) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read_doc()?;
        doc.extend(entries);
        self.write_doc(&doc)
    }
}
