//! services/api/src/adapters/store.rs
//!
//! File-backed implementation of the `PersistentStore` port: one JSON object
//! on disk, giving the feed state the browser-localStorage contract it
//! expects across process restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::warn;
use verse_feed_core::ports::PersistentStore;

/// A persistent store that mirrors every write through to a JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Loads the store from `path`, starting empty if the file is missing
    /// or unreadable.
    pub fn load(path: PathBuf) -> Self {
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn persist(&self, values: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), error = %err, "failed to create store directory");
                return;
            }
        }
        match serde_json::to_string_pretty(values) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %err, "failed to write store file");
                }
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to serialize store contents");
            }
        }
    }
}

impl PersistentStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir().join(format!("verse-feed-store-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn values_survive_a_reload_from_disk() {
        let path = temp_store_path();
        let store = JsonFileStore::load(path.clone());
        store.set("selected-edition-id", "abc-01");
        store.set("liked-verse-ids", r#"{"JHN.3.16":true}"#);

        let reloaded = JsonFileStore::load(path.clone());
        assert_eq!(
            reloaded.get("selected-edition-id").as_deref(),
            Some("abc-01")
        );
        assert_eq!(
            reloaded.get("liked-verse-ids").as_deref(),
            Some(r#"{"JHN.3.16":true}"#)
        );
        assert_eq!(reloaded.get("missing"), None);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_starts_empty() {
        let store = JsonFileStore::load(temp_store_path());
        assert_eq!(store.get("selected-edition-id"), None);
    }
}
