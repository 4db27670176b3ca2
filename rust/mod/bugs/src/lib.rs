pub mod api;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use bugtracker_core::Module;
use bugtracker_kv::KVStore;

use store::BugStore;

/// The bug module: record store plus its HTTP API.
pub struct BugsModule {
    store: Arc<BugStore>,
}

impl BugsModule {
    /// Create the module on top of an already opened document store.
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self {
            store: Arc::new(BugStore::new(kv)),
        }
    }

    /// Direct access to the record store, for in-process callers.
    pub fn store(&self) -> &Arc<BugStore> {
        &self.store
    }
}

impl Module for BugsModule {
    fn name(&self) -> &str {
        "api"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.store))
    }
}
