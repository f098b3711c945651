use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Base directory of the chunked object store.
    pub data_dir: String,
    /// Flat-file directory from the pre-migration storage mode.
    pub legacy_uploads_dir: String,
    /// Files at or below this size are stored inline in the record.
    pub inline_threshold: u64,
    /// Hard cap on a single uploaded file.
    pub max_upload_size: u64,
    /// Orphans younger than this are skipped by the sweeps.
    pub gc_grace_secs: u64,
    /// Interval of the background sweep task.
    pub gc_interval_secs: u64,
}

impl StorageConfig {
    pub fn gc_grace(&self) -> Duration {
        Duration::from_secs(self.gc_grace_secs)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.data_dir", "./data/objects")?
            .set_default("storage.legacy_uploads_dir", "./uploads")?
            .set_default("storage.inline_threshold", 1024 * 1024)?
            .set_default("storage.max_upload_size", 16 * 1024 * 1024)?
            .set_default("storage.gc_grace_secs", 3600)?
            .set_default("storage.gc_interval_secs", 6 * 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., VAULT__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
