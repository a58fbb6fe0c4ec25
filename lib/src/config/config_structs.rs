// lib/src/config/config_structs.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::config_defaults::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineType {
    Sled,
    #[serde(alias = "in_memory", alias = "memory")]
    InMemory,
}

/// Where and how the store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub engine_type: StorageEngineType,
    pub data_directory: PathBuf,
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        StorageConfig {
            engine_type: StorageEngineType::InMemory,
            data_directory: default_data_directory(),
        }
    }

    pub fn sled(data_directory: impl Into<PathBuf>) -> Self {
        StorageConfig { engine_type: StorageEngineType::Sled, data_directory: data_directory.into() }
    }
}

/// Credentials for signed Cloudinary uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

/// Process configuration. Field names match the lower-cased environment
/// variables (`JWT_SECRET` -> `jwt_secret`) so one struct serves files and env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_node_env")]
    pub node_env: String,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_socket_cors_origin")]
    pub socket_cors_origin: String,

    #[serde(default = "default_storage_engine_type", alias = "storage_engine_type")]
    pub storage_engine: StorageEngineType,
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,
    #[serde(default)]
    pub cloudinary_api_key: Option<String>,
    #[serde(default)]
    pub cloudinary_api_secret: Option<String>,
    #[serde(default = "default_cloudinary_folder")]
    pub cloudinary_folder: String,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: Option<String>,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

/// The account `seed-admin` creates or refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub name: String,
}
