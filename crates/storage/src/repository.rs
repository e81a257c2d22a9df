use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Named slots of the key-value store. Each slot holds one JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Sessions,
    Tasks,
    Tests,
    Settings,
    Goal,
    Streak,
    Timer,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::Sessions,
        Slot::Tasks,
        Slot::Tests,
        Slot::Settings,
        Slot::Goal,
        Slot::Streak,
        Slot::Timer,
    ];

    /// Stable key under which the slot is stored.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Slot::Sessions => "study.sessions",
            Slot::Tasks => "study.tasks",
            Slot::Tests => "study.tests",
            Slot::Settings => "study.settings",
            Slot::Goal => "study.goal",
            Slot::Streak => "study.streak",
            Slot::Timer => "study.timer",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One staged change to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotWrite {
    Set(Slot, String),
    Remove(Slot),
}

impl SlotWrite {
    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            SlotWrite::Set(slot, _) | SlotWrite::Remove(slot) => *slot,
        }
    }
}

/// Opaque string store. Values are whole documents; writes replace them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value of a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing slot is
    /// `Ok(None)`, not an error.
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError>;

    /// Replace the value of a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing a missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, slot: Slot) -> Result<(), StorageError>;

    /// Apply several writes as one unit: either all of them land or none do.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any write fails; the store is then unchanged.
    async fn write_batch(&self, writes: &[SlotWrite]) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<Slot, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&slot).cloned())
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(slot, value.to_owned());
        Ok(())
    }

    async fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&slot);
        Ok(())
    }

    async fn write_batch(&self, writes: &[SlotWrite]) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for write in writes {
            match write {
                SlotWrite::Set(slot, value) => {
                    guard.insert(*slot, value.clone());
                }
                SlotWrite::Remove(slot) => {
                    guard.remove(slot);
                }
            }
        }
        Ok(())
    }
}

/// Key-value backend behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryStore::new()),
        }
    }

    #[must_use]
    pub fn with_store(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }
}
