//! On-device key-value storage.
//!
//! A single JSON object on disk, read and rewritten on every call so that
//! clones of a [`LocalStore`] never disagree.

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::config::Config;

pub const FAVORITES_KEY: &str = "FAVORITE_LOCATIONS";
pub const THEME_KEY: &str = "theme";
pub const TEMP_UNIT_KEY: &str = "temp_unit";
pub const WIND_UNIT_KEY: &str = "wind_unit";
pub const ONBOARDING_KEY: &str = "onboardingComplete";
pub const SESSION_KEY: &str = "supabase.session";

const STORE_FILE: &str = "storage.json";

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Store inside the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(Config::data_dir()?))
    }

    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read local storage: {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse local storage: {}", self.path.display()))
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create storage directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(map).context("Failed to serialize local storage")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write local storage: {}", self.path.display()))
    }

    /// Raw string value, as stored by [`LocalStore::set`].
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.read_all()?.remove(key) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&map)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    /// Typed value stored as a JSON string under `key`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };

        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Stored value for '{key}' is not valid"))?;
        Ok(Some(value))
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize value for '{key}'"))?;
        self.set(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path());

        assert_eq!(store.get(THEME_KEY).unwrap(), None);
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        store.remove(THEME_KEY).unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap(), None);
        store.remove(THEME_KEY).unwrap();
    }

    #[test]
    fn json_values_are_stored_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path());

        store.set_json(FAVORITES_KEY, &vec!["Paris", "Oslo"]).unwrap();
        assert_eq!(
            store.get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["Paris","Oslo"]"#)
        );

        let back: Vec<String> = store.get_json(FAVORITES_KEY).unwrap().unwrap();
        assert_eq!(back, vec!["Paris", "Oslo"]);
    }

    #[test]
    fn clones_see_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let a = LocalStore::open(dir.path());
        let b = a.clone();

        a.set(ONBOARDING_KEY, "true").unwrap();
        b.set(THEME_KEY, "light").unwrap();

        assert_eq!(a.get(THEME_KEY).unwrap().as_deref(), Some("light"));
        assert_eq!(b.get(ONBOARDING_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path());
        fs::write(store.path(), "not json").unwrap();

        let err = store.get(THEME_KEY).unwrap_err();
        assert!(err.to_string().contains("Failed to parse local storage"));
    }
}
