use std::sync::Arc;

use bugtracker_core::{ServiceError, new_id, now_rfc3339};
use bugtracker_kv::{KVError, KVStore};
use tracing::{debug, info};

use crate::model::{Bug, BugPatch, CreateBug};

/// Key prefix of the bug collection.
const PREFIX: &str = "bugs/";

fn make_key(id: &str) -> String {
    format!("{PREFIX}{id}")
}

fn kv_err(e: KVError) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

fn encode(bug: &Bug) -> Result<Vec<u8>, KVError> {
    serde_json::to_vec(bug).map_err(|e| KVError::Serialization(e.to_string()))
}

fn decode(key: &str, bytes: &[u8]) -> Result<Bug, KVError> {
    serde_json::from_slice(bytes)
        .map_err(|e| KVError::Serialization(format!("bad bug document {key}: {e}")))
}

/// Persistent collection of bug documents, stored as JSON in a KVStore.
///
/// Ids are time-ordered, so a prefix scan yields records in insertion order.
pub struct BugStore {
    kv: Arc<dyn KVStore>,
}

impl BugStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    /// Insert a new bug. Assigns `id` and `createdAt`; `status` defaults to open.
    pub fn insert(&self, input: CreateBug) -> Result<Bug, ServiceError> {
        let bug = Bug {
            id: new_id(),
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            created_at: now_rfc3339(),
        };

        let bytes = encode(&bug).map_err(kv_err)?;
        self.kv.set(&make_key(&bug.id), &bytes).map_err(kv_err)?;

        info!(id = %bug.id, status = %bug.status, "bug created");
        Ok(bug)
    }

    /// All bugs in insertion order.
    pub fn list(&self) -> Result<Vec<Bug>, ServiceError> {
        let entries = self.kv.scan(PREFIX).map_err(kv_err)?;
        entries
            .iter()
            .map(|(key, bytes)| decode(key, bytes).map_err(kv_err))
            .collect()
    }

    /// Number of stored documents, without decoding them.
    pub fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.kv.scan(PREFIX).map_err(kv_err)?.len())
    }

    /// Get a bug by id.
    pub fn get(&self, id: &str) -> Result<Option<Bug>, ServiceError> {
        let key = make_key(id);
        match self.kv.get(&key).map_err(kv_err)? {
            Some(bytes) => decode(&key, &bytes).map(Some).map_err(kv_err),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the bug with this id.
    ///
    /// Read and write happen in one store transaction, so a concurrent
    /// delete either wins outright (`None`) or removes the updated record.
    /// Returns `None` when no such bug exists. An empty patch returns the
    /// stored record without writing.
    pub fn update(&self, id: &str, patch: BugPatch) -> Result<Option<Bug>, ServiceError> {
        let key = make_key(id);
        let writes = !patch.is_empty();
        let mut patch = Some(patch);
        let mut merged = None;

        let stored = self
            .kv
            .update(&key, &mut |bytes| {
                let mut bug = decode(&key, bytes)?;
                let patch = patch.take().unwrap_or_default();
                if patch.is_empty() {
                    merged = Some(bug);
                    return Ok(None);
                }
                bug.apply(patch);
                let next = encode(&bug)?;
                merged = Some(bug);
                Ok(Some(next))
            })
            .map_err(kv_err)?;

        match (stored, merged) {
            (Some(_), Some(bug)) => {
                if writes {
                    info!(id, status = %bug.status, "bug updated");
                }
                Ok(Some(bug))
            }
            _ => {
                debug!(id, "update of missing bug");
                Ok(None)
            }
        }
    }

    /// Delete a bug by id. Deleting a missing id is not an error.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let existed = self.kv.delete(&make_key(id)).map_err(kv_err)?;
        if existed {
            info!(id, "bug deleted");
        } else {
            debug!(id, "delete of missing bug");
        }
        Ok(())
    }
}
