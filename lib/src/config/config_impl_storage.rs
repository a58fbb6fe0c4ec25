// lib/src/config/config_impl_storage.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File};
use tracing::{debug, error, info};

use models::{ClinicError, ClinicResult};

use crate::config::config_defaults::*;
use crate::config::config_structs::*;

impl FromStr for StorageEngineType {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sled" => Ok(StorageEngineType::Sled),
            "inmemory" | "in_memory" | "memory" => Ok(StorageEngineType::InMemory),
            other => {
                error!("Unknown storage engine type: {}", other);
                Err(ClinicError::Configuration(format!("Unknown storage engine type: {}", other)))
            }
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::Sled => write!(f, "sled"),
            StorageEngineType::InMemory => write!(f, "inmemory"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: default_port(),
            host: default_host(),
            node_env: default_node_env(),
            jwt_secret: default_jwt_secret(),
            socket_cors_origin: default_socket_cors_origin(),
            storage_engine: default_storage_engine_type(),
            data_directory: default_data_directory(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_folder: default_cloudinary_folder(),
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            admin_name: default_admin_name(),
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, then the optional config file, then the
    /// process environment. A missing file is not an error.
    pub fn load(config_file: Option<&Path>) -> ClinicResult<Self> {
        let path = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        debug!("Loading configuration from {:?} and environment", path);

        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()
            .map_err(|e| ClinicError::Configuration(format!("Failed to read configuration: {}", e)))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ClinicError::Configuration(format!("Invalid configuration: {}", e)))?;

        info!(
            "Configuration loaded: {}:{} ({} storage at {:?})",
            app_config.host, app_config.port, app_config.storage_engine, app_config.data_directory
        );
        Ok(app_config)
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig { engine_type: self.storage_engine, data_directory: self.data_directory.clone() }
    }

    /// Cloudinary settings, present only when all three credentials are set.
    pub fn cloudinary(&self) -> Option<CloudinaryConfig> {
        let non_blank = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Some(CloudinaryConfig {
            cloud_name: non_blank(&self.cloudinary_cloud_name)?,
            api_key: non_blank(&self.cloudinary_api_key)?,
            api_secret: non_blank(&self.cloudinary_api_secret)?,
            folder: self.cloudinary_folder.clone(),
        })
    }

    pub fn admin_seed(&self) -> AdminSeed {
        AdminSeed {
            username: self.admin_username.clone(),
            email: self.admin_email.clone().filter(|e| !e.trim().is_empty()),
            password: self.admin_password.clone(),
            name: self.admin_name.clone(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.node_env.eq_ignore_ascii_case("production")
    }
}
