use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{KeyValueStore, Slot, SlotWrite, StorageError};

use super::SqliteRepository;

const UPSERT_SLOT: &str = r"
    INSERT INTO kv_slots (key, value, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
";

const DELETE_SLOT: &str = "DELETE FROM kv_slots WHERE key = ?1";

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_slots WHERE key = ?1")
            .bind(slot.key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.map(|row| {
            row.try_get::<String, _>("value")
                .map_err(|err| StorageError::Serialization(err.to_string()))
        })
        .transpose()
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        sqlx::query(UPSERT_SLOT)
            .bind(slot.key())
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        sqlx::query(DELETE_SLOT)
            .bind(slot.key())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn write_batch(&self, writes: &[SlotWrite]) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        let now = Utc::now();

        // Dropping `tx` on an early return rolls back everything staged so far.
        for write in writes {
            let query = match write {
                SlotWrite::Set(slot, value) => sqlx::query(UPSERT_SLOT)
                    .bind(slot.key())
                    .bind(value.as_str())
                    .bind(now),
                SlotWrite::Remove(slot) => sqlx::query(DELETE_SLOT).bind(slot.key()),
            };
            query
                .execute(&mut *tx)
                .await
                .map_err(|err| StorageError::Connection(err.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))
    }
}
