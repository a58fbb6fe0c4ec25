// lib/src/config/config_defaults.rs

use std::path::PathBuf;

use crate::config::config_structs::StorageEngineType;

pub const DEFAULT_CONFIG_FILE: &str = "clinic_config.yaml";
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/clinic";
pub const DEFAULT_HTTP_PORT: u16 = 6500;
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

pub fn default_port() -> u16 { DEFAULT_HTTP_PORT }
pub fn default_host() -> String { "0.0.0.0".to_string() }
pub fn default_node_env() -> String { "development".to_string() }
pub fn default_jwt_secret() -> String { DEFAULT_JWT_SECRET.to_string() }
pub fn default_socket_cors_origin() -> String { "*".to_string() }
pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIRECTORY)
}
pub fn default_cloudinary_folder() -> String { "clinic".to_string() }
pub fn default_admin_username() -> String { "admin".to_string() }
pub fn default_admin_email() -> Option<String> { Some("admin@clinic.local".to_string()) }
pub fn default_admin_password() -> String { "admin123".to_string() }
pub fn default_admin_name() -> String { "Admin".to_string() }
