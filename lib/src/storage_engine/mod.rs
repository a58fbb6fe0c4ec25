// lib/src/storage_engine/mod.rs

pub mod catalog;
pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;

pub use catalog::{Catalog, ChangeSet, Mutation, Table};
pub use inmemory_storage::InMemoryStorage;
pub use sled_storage::{open_sled_db, SledStorage};
pub use storage_engine::StorageEngine;

use std::sync::Arc;

use tracing::info;

use models::ClinicResult;

use crate::config::{StorageConfig, StorageEngineType};

/// Creates a storage engine instance based on the provided configuration.
pub fn create_storage(config: &StorageConfig) -> ClinicResult<Arc<dyn StorageEngine>> {
    info!("Creating {} storage engine", config.engine_type);
    match config.engine_type {
        StorageEngineType::Sled => {
            let storage = SledStorage::open(&config.data_directory)?;
            Ok(Arc::new(storage))
        }
        StorageEngineType::InMemory => Ok(Arc::new(InMemoryStorage::new())),
    }
}
