// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;

use models::ClinicResult;

use crate::config::StorageEngineType;
use crate::storage_engine::catalog::{Catalog, ChangeSet};

/// Durable backing for the catalog. `load` runs once at startup; every
/// write transaction then goes through `commit`, which must apply the whole
/// change set or none of it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageEngine: Send + Sync + 'static {
    async fn load(&self) -> ClinicResult<Catalog>;
    async fn commit(&self, changes: &ChangeSet) -> ClinicResult<()>;
    async fn flush(&self) -> ClinicResult<()>;
    fn get_type(&self) -> StorageEngineType;
}
