//! Configuration module
//!
//! Settings are read from the environment (optionally seeded from a `.env` file) once at
//! startup and validated before any listener is bound.

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_ALLOWED_FILE_EXTENSIONS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT};

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 500;

/// Settings every HTTP-facing process needs.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// `json` switches log output to JSON lines; anything else is the compact format.
    pub log_format: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

/// Report ingestion and upload gateway configuration.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub database_url: String,
    /// Flat directory holding one file per resource identifier.
    pub base_dir: PathBuf,
    pub max_upload_size_bytes: usize,
    /// Lowercase, without leading dot.
    pub allowed_file_extensions: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    /// Configuration with defaults for everything except the two required settings.
    pub fn new(database_url: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Config(Box::new(ServiceConfig {
            base: BaseConfig::default(),
            database_url: database_url.into(),
            base_dir: base_dir.into(),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            allowed_file_extensions: DEFAULT_ALLOWED_FILE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }))
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let base_dir = var("BASE_DIR").ok_or_else(|| anyhow::anyhow!("BASE_DIR must be set"))?;

        let mut config = Config::new(database_url, base_dir);
        let service = config.0.as_mut();

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        service.base = BaseConfig {
            server_host: var("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: var("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            cors_origins: cors_origins_str
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: var("LOG_FORMAT").unwrap_or_else(|| "compact".to_string()),
        };

        let max_upload_size_mb = var("MAX_UPLOAD_SIZE_MB")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);
        service.max_upload_size_bytes = max_upload_size_mb * 1024 * 1024;

        if let Some(extensions) = var("ALLOWED_FILE_EXTENSIONS") {
            service.allowed_file_extensions = extensions
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let service = self.0.as_ref();

        if !service.database_url.starts_with("postgres://")
            && !service.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if service.base_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("BASE_DIR must not be empty"));
        }

        if service.allowed_file_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_FILE_EXTENSIONS must name at least one extension"
            ));
        }

        if service.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if service.base.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.0.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_host(&self) -> &str {
        &self.0.base.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.0.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.0.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.0.base.db_timeout_seconds
    }

    pub fn log_format(&self) -> &str {
        &self.0.base.log_format
    }

    pub fn database_url(&self) -> &str {
        &self.0.database_url
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.0.base_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.0.max_upload_size_bytes
    }

    pub fn allowed_file_extensions(&self) -> &[String] {
        &self.0.allowed_file_extensions
    }
}
