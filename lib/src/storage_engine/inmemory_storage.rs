// lib/src/storage_engine/inmemory_storage.rs

use async_trait::async_trait;

use models::ClinicResult;

use super::catalog::{Catalog, ChangeSet};
use super::storage_engine::StorageEngine;
use crate::config::StorageEngineType;

/// Keeps nothing beyond the catalog itself; data is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStorage;

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage
    }
}

#[async_trait]
impl StorageEngine for InMemoryStorage {
    async fn load(&self) -> ClinicResult<Catalog> {
        Ok(Catalog::default())
    }

    async fn commit(&self, _changes: &ChangeSet) -> ClinicResult<()> {
        Ok(())
    }

    async fn flush(&self) -> ClinicResult<()> {
        Ok(())
    }

    fn get_type(&self) -> StorageEngineType {
        StorageEngineType::InMemory
    }
}
