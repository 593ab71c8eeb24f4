//! Configuration module
//!
//! Settings are read once from the environment (after loading `.env`) and
//! handed to components as plain structs; nothing below the binary reads the
//! environment itself.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_LOCAL_STORAGE_PATH, DEFAULT_MAX_FILE_SIZE_BYTES,
    DEFAULT_ORPHAN_GRACE_MULTIPLIER, DEFAULT_RETRIEVAL_BASE_PATH, DEFAULT_SESSION_TTL_HOURS,
    DEFAULT_SWEEP_INTERVAL_SECS, MAX_SESSION_TTL_HOURS, MIN_ORPHAN_GRACE_MULTIPLIER,
};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 5;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Settings for the document store.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub session_ttl: Duration,
    pub max_file_size_bytes: usize,
    pub retrieval_base_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            retrieval_base_path: DEFAULT_RETRIEVAL_BASE_PATH.to_string(),
        }
    }
}

/// Settings for the reconciliation service.
#[derive(Clone, Debug)]
pub struct ReconciliationSettings {
    pub sweep_interval: Duration,
    /// Minimum blob age before an unreferenced blob may be deleted.
    pub orphan_grace: Duration,
}

impl ReconciliationSettings {
    /// Grace window derived as `multiplier × interval`.
    /// Multipliers below one interval (or not finite) fall back to the default.
    pub fn from_interval(sweep_interval: Duration, grace_multiplier: f64) -> Self {
        let multiplier = if grace_multiplier.is_finite()
            && grace_multiplier >= MIN_ORPHAN_GRACE_MULTIPLIER
        {
            grace_multiplier
        } else {
            DEFAULT_ORPHAN_GRACE_MULTIPLIER
        };
        let orphan_grace =
            Duration::try_from_secs_f64(sweep_interval.as_secs_f64() * multiplier)
                .unwrap_or(Duration::MAX);

        Self {
            sweep_interval,
            orphan_grace,
        }
    }
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self::from_interval(
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            DEFAULT_ORPHAN_GRACE_MULTIPLIER,
        )
    }
}

#[derive(Clone, Debug)]
pub struct DocvaultConfig {
    pub environment: String,
    pub log_format: String,
    // Metadata store
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Blob directory
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    // Store
    pub session_ttl_hours: u64,
    pub max_file_size_bytes: usize,
    pub retrieval_base_path: String,
    // Reconciliation
    pub sweep_interval_secs: u64,
    pub orphan_grace_multiplier: f64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DocvaultConfig>);

impl Config {
    fn inner(&self) -> &DocvaultConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DocvaultConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn json_logs(&self) -> bool {
        self.inner().log_format.eq_ignore_ascii_case("json")
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn store_settings(&self) -> StoreSettings {
        let inner = self.inner();
        StoreSettings {
            session_ttl: Duration::from_secs(inner.session_ttl_hours.saturating_mul(3600)),
            max_file_size_bytes: inner.max_file_size_bytes,
            retrieval_base_path: inner.retrieval_base_path.clone(),
        }
    }

    pub fn reconciliation_settings(&self) -> ReconciliationSettings {
        let inner = self.inner();
        ReconciliationSettings::from_interval(
            Duration::from_secs(inner.sweep_interval_secs),
            inner.orphan_grace_multiplier,
        )
    }
}

impl DocvaultConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.parse::<StorageBackend>()?,
            _ => StorageBackend::Local,
        };

        let config = DocvaultConfig {
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .or_else(|| Some(DEFAULT_LOCAL_STORAGE_PATH.to_string())),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION").ok().filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            aws_region: env::var("AWS_REGION").ok().filter(|s| !s.is_empty()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| DEFAULT_SESSION_TTL_HOURS.to_string())
                .parse()
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
            retrieval_base_path: env::var("RETRIEVAL_BASE_PATH")
                .unwrap_or_else(|_| DEFAULT_RETRIEVAL_BASE_PATH.to_string()),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            orphan_grace_multiplier: env::var("ORPHAN_GRACE_MULTIPLIER")
                .unwrap_or_else(|_| DEFAULT_ORPHAN_GRACE_MULTIPLIER.to_string())
                .parse()
                .unwrap_or(DEFAULT_ORPHAN_GRACE_MULTIPLIER),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a SQLite connection string (sqlite://...)"
            ));
        }

        if self.session_ttl_hours == 0 {
            return Err(anyhow::anyhow!("SESSION_TTL_HOURS must be greater than 0"));
        }

        if self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(anyhow::anyhow!(
                "SESSION_TTL_HOURS must be at most {}",
                MAX_SESSION_TTL_HOURS
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        if self.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("SWEEP_INTERVAL_SECS must be greater than 0"));
        }

        if !self.orphan_grace_multiplier.is_finite()
            || self.orphan_grace_multiplier < MIN_ORPHAN_GRACE_MULTIPLIER
        {
            return Err(anyhow::anyhow!(
                "ORPHAN_GRACE_MULTIPLIER must be a number of at least {}",
                MIN_ORPHAN_GRACE_MULTIPLIER
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
