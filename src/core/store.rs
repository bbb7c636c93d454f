//! Registry persistence.
//!
//! [`JsonFileStore`] writes the whole registry as pretty JSON through a
//! temp file in the same directory, then renames it over the target, so a
//! crash mid-write never leaves a truncated registry behind.

use super::action::TagAction;
use super::tag::TagUid;
use indexmap::IndexMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Registry contents keyed by UID, in insertion order.
pub type Entries = IndexMap<TagUid, TagAction>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to replace {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

/// Backing storage for the registry.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<Entries, StoreError>;
    fn save(&self, entries: &Entries) -> Result<(), StoreError>;
}

impl<T: RegistryStore + ?Sized> RegistryStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Entries, StoreError> {
        (**self).load()
    }

    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        (**self).save(entries)
    }
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Entries, StoreError> {
        if !self.path.exists() {
            log::info!("No registry at {}, starting empty", self.path.display());
            return Ok(Entries::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        let stored: Entries = serde_json::from_str(&content)?;

        // The descriptor's own uid is authoritative over the map key.
        // Entries that registration would reject are dropped.
        let entries: Entries = stored
            .into_values()
            .filter_map(|raw| {
                match TagAction::new(raw.kind, raw.uid.clone(), raw.alias.as_deref(), raw.parameter.as_deref()) {
                    Ok(action) => Some((action.uid.clone(), action)),
                    Err(e) => {
                        log::warn!("Skipping stored tag {}: {}", raw.uid, e);
                        None
                    }
                }
            })
            .collect();

        log::debug!("Loaded {} tags from {}", entries.len(), self.path.display());
        Ok(entries)
    }

    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(entries)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        log::debug!("Saved {} tags to {}", entries.len(), self.path.display());
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Entries) -> Self {
        Self {
            saved: Mutex::new(entries),
        }
    }

    /// Last saved contents
    pub fn snapshot(&self) -> Entries {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Entries, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = entries.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionKind;
    use tempfile::TempDir;

    fn entry(uid: &str, kind: ActionKind, parameter: Option<&str>) -> (TagUid, TagAction) {
        let uid = TagUid::parse(uid).unwrap();
        let action = TagAction::new(kind, uid.clone(), None, parameter).unwrap();
        (uid, action)
    }

    #[test]
    fn test_missing_file_loads_empty() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("registry.json"));
        assert!(store.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_blank_file_loads_empty() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(&path, "  \n")?;
        assert!(JsonFileStore::new(&path).load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("registry.json");
        let store = JsonFileStore::new(&path);

        let entries: Entries = [
            entry("0A1B2C3D", ActionKind::PlayResource, Some("spotify:track:xyz")),
            entry("FF00", ActionKind::Stop, None),
        ]
        .into_iter()
        .collect();

        store.save(&entries)?;
        let loaded = JsonFileStore::new(&path).load()?;

        assert_eq!(loaded, entries);
        assert_eq!(
            loaded.keys().map(TagUid::as_str).collect::<Vec<_>>(),
            vec!["0A1B2C3D", "FF00"]
        );

        // No temp files left beside the registry
        let files: Vec<_> = fs::read_dir(path.parent().unwrap())?.collect();
        assert_eq!(files.len(), 1);
        Ok(())
    }

    #[test]
    fn test_load_rekeys_by_uid_field() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(
            &path,
            r#"{"abcd": {"kind": "Stop", "uid": "beef", "alias": null, "parameter": null}}"#,
        )?;

        let loaded = JsonFileStore::new(&path).load()?;
        let key = TagUid::parse("BEEF").unwrap();
        assert!(loaded.contains_key(&key));
        assert_eq!(loaded.len(), 1);
        Ok(())
    }

    #[test]
    fn test_load_skips_entries_registration_rejects() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(
            &path,
            r#"{
                "01": {"kind": "Unknown", "uid": "01", "alias": null, "parameter": null},
                "02": {"kind": "Volume", "uid": "02", "alias": null, "parameter": null},
                "03": {"kind": "Volume", "uid": "03", "alias": null, "parameter": "250"},
                "04": {"kind": "Stop", "uid": "04", "alias": "", "parameter": null,
                       "scanned": "2024-05-01T10:00:00Z"}
            }"#,
        )?;

        let loaded = JsonFileStore::new(&path).load()?;
        assert_eq!(loaded.len(), 1);
        let stop = &loaded[&TagUid::parse("04").unwrap()];
        assert_eq!(stop.kind, ActionKind::Stop);
        assert_eq!(stop.alias, None);
        assert_eq!(stop.scanned, None);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Serialization(_))
        ));
    }
}
