#![forbid(unsafe_code)]

pub mod records;
pub mod repository;
pub mod snapshot;
pub mod sqlite;

pub use repository::{InMemoryStore, KeyValueStore, Slot, SlotWrite, Storage, StorageError};
pub use snapshot::{SnapshotBatch, Snapshots};
