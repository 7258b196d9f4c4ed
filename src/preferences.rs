//! Persisted user preferences.
//!
//! Preferences are one JSON record stored under [`STORAGE_KEY`]. The record
//! is read once when the store is loaded and rewritten in full on every
//! change. Unknown fields are carried through untouched.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::Result;

/// Key the preference record is stored under.
pub const STORAGE_KEY: &str = "metasearch";

/// User preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Engines whose results are collapsed, kept sorted.
    #[serde(rename = "hiddenEngines", default)]
    hidden_engines: BTreeSet<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Preferences {
    /// Returns the hidden engine ids in sorted order.
    pub fn hidden_engines(&self) -> impl Iterator<Item = &str> {
        self.hidden_engines.iter().map(String::as_str)
    }

    /// Returns whether the engine's results are hidden.
    pub fn is_hidden(&self, engine_id: &str) -> bool {
        self.hidden_engines.contains(engine_id)
    }

    /// Returns a copy with the engine's hidden flag flipped.
    pub fn toggled(&self, engine_id: &str) -> Self {
        let mut next = self.clone();
        if !next.hidden_engines.remove(engine_id) {
            next.hidden_engines.insert(engine_id.to_string());
        }
        next
    }
}

/// Durable key-value storage for the preference record.
pub trait PreferenceBackend: Send + Sync {
    /// Reads the raw value stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `dir`. The directory is created on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the file a key is stored in.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PreferenceBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory backend, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding one preset value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let backend = Self::new();
        backend
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        backend
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Owner of the current preferences.
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    current: Preferences,
}

impl PreferenceStore {
    /// Loads preferences from the backend.
    ///
    /// Missing, unreadable or malformed data yields the defaults.
    pub fn load(backend: Arc<dyn PreferenceBackend>) -> Self {
        let current = match backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed preferences: {}", e);
                Preferences::default()
            }),
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!("Failed to read preferences: {}", e);
                Preferences::default()
            }
        };
        debug!("Loaded preferences: {:?}", current);
        Self { backend, current }
    }

    /// Returns the last preferences written.
    pub fn get(&self) -> &Preferences {
        &self.current
    }

    /// Replaces the preferences and persists them in full.
    pub fn save(&mut self, preferences: Preferences) -> Result<()> {
        let raw = serde_json::to_string(&preferences)?;
        self.current = preferences;
        self.backend.write(STORAGE_KEY, &raw)
    }

    /// Hides a visible engine or shows a hidden one.
    pub fn toggle_engine(&mut self, engine_id: &str) -> Result<&Preferences> {
        let next = self.current.toggled(engine_id);
        self.save(next)?;
        Ok(&self.current)
    }
}
