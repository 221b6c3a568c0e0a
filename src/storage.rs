use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conversation::{Conversation, Preferences};

/// Key holding the JSON array of turns
pub const HISTORY_KEY: &str = "phoenixChatHistory";
/// Key holding the JSON boolean streaming preference
pub const STREAMING_KEY: &str = "phoenixStreamingEnabled";

/// Minimal string key-value storage, the same surface a browser's local storage offers
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// One `<key>.json` file per entry inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory up front so later writes only fail on real I/O trouble
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).context("Failed to create storage directory")?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).context("Failed to create storage directory")?;

        // Write-then-rename keeps the previous value intact if we die mid-write
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// Entries that vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

fn load_json<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            tracing::warn!(key, error = %err, "Failed to read saved state, starting fresh");
            return T::default();
        }
    };

    if raw.trim().is_empty() {
        return T::default();
    }

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "Saved state is corrupt, starting fresh");
            T::default()
        }
    }
}

fn save_json<T, S>(store: &mut S, key: &str, value: &T)
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let result = serde_json::to_string(value)
        .context("Failed to serialize state")
        .and_then(|json| store.set(key, &json));

    if let Err(err) = result {
        tracing::warn!(key, error = %err, "Failed to persist state");
    }
}

pub fn load_conversation<S: KeyValueStore + ?Sized>(store: &S) -> Conversation {
    load_json(store, HISTORY_KEY)
}

pub fn save_conversation<S: KeyValueStore + ?Sized>(store: &mut S, conversation: &Conversation) {
    save_json(store, HISTORY_KEY, conversation)
}

pub fn clear_conversation<S: KeyValueStore + ?Sized>(store: &mut S) {
    if let Err(err) = store.remove(HISTORY_KEY) {
        tracing::warn!(key = HISTORY_KEY, error = %err, "Failed to remove saved history");
    }
}

pub fn load_preferences<S: KeyValueStore + ?Sized>(store: &S) -> Preferences {
    load_json(store, STREAMING_KEY)
}

pub fn save_preferences<S: KeyValueStore + ?Sized>(store: &mut S, preferences: &Preferences) {
    save_json(store, STREAMING_KEY, preferences)
}
