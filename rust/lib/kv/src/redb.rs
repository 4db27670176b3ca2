use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage_err(e: impl std::fmt::Display) -> KVError {
    KVError::Storage(e.to_string())
}

/// RedbStore is a KVStore implementation backed by redb, a pure-Rust embedded
/// key-value database. Every write is its own serializable transaction.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage_err)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        debug!(path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(TABLE).map_err(storage_err)?;

        match table.get(key) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, KVError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(TABLE).map_err(storage_err)?;
            let removed = table.remove(key).map_err(storage_err)?;
            removed.is_some()
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&[u8]) -> Result<Option<Vec<u8>>, KVError>,
    ) -> Result<Option<Vec<u8>>, KVError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let (value, changed) = {
            let mut table = write_txn.open_table(TABLE).map_err(storage_err)?;
            let current = table
                .get(key)
                .map_err(storage_err)?
                .map(|val| val.value().to_vec());
            match current {
                None => (None, false),
                Some(current) => match f(&current)? {
                    Some(next) => {
                        table.insert(key, next.as_slice()).map_err(storage_err)?;
                        (Some(next), true)
                    }
                    None => (Some(current), false),
                },
            }
        };
        if changed {
            write_txn.commit().map_err(storage_err)?;
        } else {
            write_txn.abort().map_err(storage_err)?;
        }
        Ok(value)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(TABLE).map_err(storage_err)?;

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(storage_err)?;

        for entry in iter {
            let (key, value) = entry.map_err(storage_err)?;
            let key = key.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key, value.value().to_vec()));
        }

        Ok(results)
    }
}
