// lib/src/storage_engine/sled_storage.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sled::transaction::{TransactionError, TransactionResult, Transactional};
use sled::{Db, Tree};
use tracing::{debug, error, info};

use models::{ClinicError, ClinicResult};

use super::catalog::{Catalog, ChangeSet, Table};
use super::storage_engine::StorageEngine;
use crate::config::StorageEngineType;

/// Opens (creating if needed) a sled database at `path`.
pub fn open_sled_db(path: &Path) -> ClinicResult<Db> {
    if !path.exists() {
        info!("Creating database directory at {:?}", path);
        fs::create_dir_all(path).map_err(|e| {
            error!("Failed to create database directory at {:?}: {}", path, e);
            ClinicError::Storage(format!("Failed to create database directory at {:?}: {}", path, e))
        })?;
    } else if !path.is_dir() {
        return Err(ClinicError::Storage(format!("Path {:?} is not a directory", path)));
    }

    sled::Config::new().path(path).open().map_err(|e| {
        error!("Failed to open Sled database at {:?}: {}", path, e);
        ClinicError::Storage(format!("Failed to open Sled database at {:?}: {}", path, e))
    })
}

/// One tree per table, rows stored as JSON under their primary key.
/// A change set is committed as a single multi-tree transaction.
pub struct SledStorage {
    db: Db,
    trees: Vec<Tree>,
    path: PathBuf,
}

impl SledStorage {
    pub fn open(path: &Path) -> ClinicResult<Self> {
        let db = open_sled_db(path)?;
        let trees = Table::ALL
            .iter()
            .map(|table| db.open_tree(table.name()))
            .collect::<Result<Vec<_>, sled::Error>>()?;
        info!("Opened Sled storage at {:?} with {} trees", path, trees.len());
        Ok(SledStorage { db, trees, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tree(&self, table: Table) -> &Tree {
        &self.trees[table.index()]
    }

    fn load_table<T: DeserializeOwned>(&self, table: Table) -> ClinicResult<BTreeMap<String, T>> {
        let mut rows = BTreeMap::new();
        for entry in self.tree(table).iter() {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| {
                ClinicError::Serialization(format!("Non UTF-8 key in table {}: {}", table.name(), e))
            })?;
            let row = serde_json::from_slice(&value).map_err(|e| {
                ClinicError::Serialization(format!("Corrupt row {} in table {}: {}", key, table.name(), e))
            })?;
            rows.insert(key, row);
        }
        Ok(rows)
    }
}

#[async_trait]
impl StorageEngine for SledStorage {
    async fn load(&self) -> ClinicResult<Catalog> {
        let catalog = Catalog {
            users: self.load_table(Table::Users)?,
            departments: self.load_table(Table::Departments)?,
            specialties: self.load_table(Table::Specialties)?,
            doctors: self.load_table(Table::Doctors)?,
            receptionists: self.load_table(Table::Receptionists)?,
            patients: self.load_table(Table::Patients)?,
            appointments: self.load_table(Table::Appointments)?,
        };
        debug!(
            "Loaded catalog from {:?}: {} users, {} departments, {} appointments",
            self.path,
            catalog.users.len(),
            catalog.departments.len(),
            catalog.appointments.len()
        );
        Ok(catalog)
    }

    async fn commit(&self, changes: &ChangeSet) -> ClinicResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // Serialize up front so the transaction body cannot fail on encoding.
        let writes = changes
            .iter()
            .map(|m| Ok((m.table().index(), m.key().to_string(), m.encode()?)))
            .collect::<ClinicResult<Vec<(usize, String, Option<Vec<u8>>)>>>()?;

        let result: TransactionResult<(), ()> = self.trees.as_slice().transaction(|views| {
            for (index, key, value) in &writes {
                match value {
                    Some(bytes) => {
                        views[*index].insert(key.as_bytes(), bytes.as_slice())?;
                    }
                    None => {
                        views[*index].remove(key.as_bytes())?;
                    }
                }
            }
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => {
                error!("Sled transaction failed: {}", e);
                return Err(ClinicError::Storage(format!("Transaction failed: {}", e)));
            }
            Err(TransactionError::Abort(())) => {
                return Err(ClinicError::Storage("Transaction aborted".to_string()));
            }
        }

        self.flush().await
    }

    async fn flush(&self) -> ClinicResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn get_type(&self) -> StorageEngineType {
        StorageEngineType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::catalog::Mutation;
    use chrono::Utc;
    use models::{Department, Specialty};

    fn department(id: &str) -> Department {
        Department { id: id.into(), name: format!("Dept {id}"), created_at: Utc::now() }
    }

    #[tokio::test]
    async fn should_persist_committed_rows_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = SledStorage::open(dir.path()).unwrap();
            let changes = ChangeSet::from(vec![
                Mutation::PutDepartment(department("d1")),
                Mutation::PutSpecialty(Specialty {
                    id: "s1".into(),
                    name: "Pediatrics".into(),
                    department_id: "d1".into(),
                }),
            ]);
            storage.commit(&changes).await.unwrap();
        }

        let reopened = SledStorage::open(dir.path()).unwrap();
        let catalog = reopened.load().await.unwrap();
        assert_eq!(catalog.departments["d1"].name, "Dept d1");
        assert_eq!(catalog.specialties["s1"].department_id, "d1");
        assert_eq!(reopened.get_type(), StorageEngineType::Sled);
    }

    #[tokio::test]
    async fn should_apply_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        storage
            .commit(&ChangeSet::from(vec![Mutation::PutDepartment(department("d1"))]))
            .await
            .unwrap();
        storage
            .commit(&ChangeSet::from(vec![Mutation::DeleteDepartment("d1".into())]))
            .await
            .unwrap();
        assert!(storage.load().await.unwrap().departments.is_empty());
    }
}
