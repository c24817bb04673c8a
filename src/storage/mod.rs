pub mod json_file;

pub use json_file::JsonFileStore;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// Document store behind the bot's persistent state. Keys map to arbitrary
/// JSON values; `save_all` writes a batch of keys as one unit.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>>;

    fn save_all(&self, entries: Map<String, Value>) -> Result<()>;

    fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value);
        self.save_all(entries)
    }
}

/// Typed read; missing keys yield `default`.
pub fn load_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> Result<T> {
    match store.load(key)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(default),
    }
}

pub fn save_as<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.save(key, serde_json::to_value(value)?)
}

/// In-process store used by tests and the replay harness.
#[derive(Default)]
pub struct MemoryStore {
    doc: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(doc.get(key).cloned())
    }

    fn save_all(&self, entries: Map<String, Value>) -> Result<()> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        doc.extend(entries);
        Ok(())
    }
}

const ENABLED_KEY: &str = "enabled";
const SYMBOLS_KEY: &str = "monitored_symbols";

/// Operator-controlled switches that survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    pub enabled: bool,
    pub monitored_symbols: Vec<String>,
}

impl BotState {
    /// Reads the state, filling absent keys with `enabled = true` and the
    /// configured default symbols.
    pub fn load(store: &dyn KeyValueStore, default_symbols: &[String]) -> Result<Self> {
        Ok(Self {
            enabled: load_or(store, ENABLED_KEY, true)?,
            monitored_symbols: load_or(store, SYMBOLS_KEY, default_symbols.to_vec())?,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let mut entries = Map::new();
        entries.insert(ENABLED_KEY.to_string(), Value::Bool(self.enabled));
        entries.insert(
            SYMBOLS_KEY.to_string(),
            serde_json::to_value(&self.monitored_symbols)?,
        );
        store.save_all(entries)
    }
}
