// lib/src/lib.rs
//! Core of the clinic backend: configuration, the durable store, the use-case
//! services, realtime notifications and image uploads.

pub mod clinic_store;
pub mod config;
pub mod database;
pub mod notifications;
pub mod services;
pub mod storage_engine;
pub mod uploads;

#[cfg(test)]
mod test_support;

pub use clinic_store::{ClinicStore, PageRequest};
pub use config::{AppConfig, StorageConfig, StorageEngineType};
pub use database::Database;
pub use notifications::{Channel, NotificationHub, Notifier, RealtimeEvent};
pub use storage_engine::{open_sled_db, StorageEngine};
pub use uploads::{CloudinaryImageStore, ImageStore, ImageUpload};
