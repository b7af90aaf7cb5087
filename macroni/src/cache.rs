//! JSON-backed caches for interactively captured values.
//!
//! Each cache is one JSON object keyed by label. A missing file is an empty
//! cache; an unreadable one is logged and also treated as empty, so a
//! corrupt cache never stops a script.

use macroni_interpreter::HostError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const COORDINATES_CACHE: &str = "coordinates_cache.json";
pub const PIXEL_COLORS_CACHE: &str = "pixel_colors_cache.json";
pub const REGIONS_CACHE: &str = "regions_cache.json";
pub const RECORDINGS_CACHE: &str = "recordings_cache.json";

#[derive(Debug)]
pub struct JsonCache<T> {
    path: PathBuf,
    entries: BTreeMap<String, T>,
}

impl<T: Serialize + DeserializeOwned> JsonCache<T> {
    /// Open `file` under `dir`, reading existing entries
    pub fn open(dir: &Path, file: &str) -> Self {
        let path = dir.join(file);
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable cache");
                BTreeMap::new()
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable cache");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Store `value` under `key` and write the whole cache back
    pub fn insert(&mut self, key: &str, value: T) -> Result<(), HostError> {
        self.entries.insert(key.to_string(), value);
        self.save()
    }

    fn save(&self) -> Result<(), HostError> {
        let cache_error = |message: String| HostError::Cache {
            path: self.path.display().to_string(),
            message,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| cache_error(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&self.entries).map_err(|e| cache_error(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| cache_error(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "cache saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroni_interpreter::{Point, RecordedEvent};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache: JsonCache<(i64, i64)> = JsonCache::open(dir.path(), COORDINATES_CACHE);
        assert_eq!(cache.len(), 0);
        assert!(!dir.path().join(COORDINATES_CACHE).exists());
    }

    #[test]
    fn test_insert_persists() {
        let dir = TempDir::new().unwrap();
        let mut cache: JsonCache<(i64, i64)> = JsonCache::open(dir.path(), COORDINATES_CACHE);
        cache.insert("bank", (10, 20)).unwrap();

        let reopened: JsonCache<(i64, i64)> = JsonCache::open(dir.path(), COORDINATES_CACHE);
        assert_eq!(reopened.get("bank"), Some(&(10, 20)));
        assert_eq!(reopened.len(), 1);

        let text = fs::read_to_string(dir.path().join(COORDINATES_CACHE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["bank"], serde_json::json!([10, 20]));
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(REGIONS_CACHE), "{ not json").unwrap();

        let cache: JsonCache<(i64, i64, i64, i64)> = JsonCache::open(dir.path(), REGIONS_CACHE);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("caches").join("macroni");
        let mut cache: JsonCache<(u8, u8, u8)> = JsonCache::open(&nested, PIXEL_COLORS_CACHE);
        cache.insert("health", (0, 200, 0)).unwrap();
        assert!(nested.join(PIXEL_COLORS_CACHE).exists());
    }

    #[test]
    fn test_recordings_round_trip_through_serde() {
        let dir = TempDir::new().unwrap();
        let events = vec![
            RecordedEvent::mouse_move(0.0, Point::new(1, 2), None),
            RecordedEvent::key(0.5, "a", true),
        ];
        let mut cache: JsonCache<Vec<RecordedEvent>> = JsonCache::open(dir.path(), RECORDINGS_CACHE);
        cache.insert("route", events.clone()).unwrap();

        let reopened: JsonCache<Vec<RecordedEvent>> = JsonCache::open(dir.path(), RECORDINGS_CACHE);
        assert_eq!(reopened.get("route"), Some(&events));

        let text = fs::read_to_string(dir.path().join(RECORDINGS_CACHE)).unwrap();
        assert!(text.contains("\"kind\": \"key_down\""));
        assert!(!text.contains("duration_ms"));
    }
}
