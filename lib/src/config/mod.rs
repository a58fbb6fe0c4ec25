// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_impl_storage;
pub mod config_structs;

pub use config_defaults::*;
pub use config_structs::{AdminSeed, AppConfig, CloudinaryConfig, StorageConfig, StorageEngineType};
