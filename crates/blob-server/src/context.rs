use std::sync::Arc;

use blob_database::{DatabaseManager, InMemoryKeyValueStore, KeyValueStore};
use blob_storage::{InMemoryObjectStorage, ObjectStorage, StorageManager};
use blob_types::{Clock, SystemClock};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::locks::KeyedLocks;

/// Everything a call needs, shared by all calls of one server.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    database: DatabaseManager,
    storage: StorageManager,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
    config: Arc<ServerConfig>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        storage: Arc<dyn ObjectStorage>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> Self {
        Self {
            database: DatabaseManager::new(store, config.tables.clone()),
            storage: StorageManager::new(storage),
            clock,
            locks: KeyedLocks::new(),
            config: Arc::new(config),
        }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Per-content-hash locks guarding first-writer blob creation.
    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Fail unless the configured bucket is reachable.
    pub async fn ensure_ready(&self) -> ServerResult<()> {
        self.storage.ensure_bucket(&self.config.bucket).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("database", &self.database)
            .field("storage", &self.storage)
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// In-memory stores wired to a config, for tests and local runs.
#[derive(Clone, Debug)]
pub struct InMemoryBackends {
    pub store: Arc<InMemoryKeyValueStore>,
    pub storage: Arc<InMemoryObjectStorage>,
}

impl InMemoryBackends {
    /// Stores with the configured bucket present and the part floor set to
    /// `config.min_chunk_size`.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(InMemoryKeyValueStore::new()),
            storage: Arc::new(InMemoryObjectStorage::new(
                [config.bucket.clone()],
                config.min_chunk_size,
            )),
        }
    }

    pub fn context(&self, config: ServerConfig) -> ServiceContext {
        self.context_with_clock(config, Arc::new(SystemClock))
    }

    pub fn context_with_clock(&self, config: ServerConfig, clock: Arc<dyn Clock>) -> ServiceContext {
        ServiceContext::new(self.store.clone(), self.storage.clone(), clock, config)
    }
}
