//! Configuration module
//!
//! This module provides configuration structures for the conversion service,
//! including server, storage, converter, and media index settings. Everything
//! is read from the environment (with `.env` support) once at startup.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 4000;
const MAX_UPLOAD_MB: usize = 30;
const MAX_STORED_SOURCE_MB: usize = 200;
const PANDOC_TIMEOUT_SECS: u64 = 120;
const INDEX_CAS_MAX_ATTEMPTS: u32 = 5;

/// How the media index document is rewritten after a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWriteStrategy {
    /// Read, prepend, write back unconditionally. Concurrent registrations can lose entries.
    Simple,
    /// Write back only if the index is unchanged since it was read; re-read and retry otherwise.
    CompareAndSwap { max_attempts: u32 },
}

impl FromStr for IndexWriteStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(IndexWriteStrategy::Simple),
            "cas" | "compare-and-swap" => Ok(IndexWriteStrategy::CompareAndSwap {
                max_attempts: INDEX_CAS_MAX_ATTEMPTS,
            }),
            _ => Err(anyhow::anyhow!("Invalid index write strategy: {}", s)),
        }
    }
}

impl Display for IndexWriteStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IndexWriteStrategy::Simple => write!(f, "simple"),
            IndexWriteStrategy::CompareAndSwap { max_attempts } => {
                write!(f, "cas(max_attempts={})", max_attempts)
            }
        }
    }
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Conversion service configuration
#[derive(Clone, Debug)]
pub struct ConverterServiceConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (R2, MinIO, etc.)
    pub aws_region: Option<String>,
    pub public_media_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Input limits
    pub max_upload_bytes: usize,
    pub max_stored_source_bytes: usize,
    // Converters
    pub pandoc_path: String,
    pub pandoc_timeout_secs: u64,
    pub fallback_converter_enabled: bool,
    pub scratch_dir_prefix: String,
    // Asset naming
    pub asset_key_namespace: String,
    pub asset_name_prefix: String,
    // Media index
    pub media_index_key: String,
    pub index_write_strategy: IndexWriteStrategy,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ConverterServiceConfig>);

impl Config {
    fn inner(&self) -> &ConverterServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ConverterServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().base.log_format
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.inner().storage_backend
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

    pub fn public_media_url(&self) -> Option<&str> {
        self.inner().public_media_url.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner().max_upload_bytes
    }

    pub fn max_stored_source_bytes(&self) -> usize {
        self.inner().max_stored_source_bytes
    }

    pub fn pandoc_path(&self) -> &str {
        &self.inner().pandoc_path
    }

    pub fn pandoc_timeout_secs(&self) -> u64 {
        self.inner().pandoc_timeout_secs
    }

    pub fn fallback_converter_enabled(&self) -> bool {
        self.inner().fallback_converter_enabled
    }

    pub fn scratch_dir_prefix(&self) -> &str {
        &self.inner().scratch_dir_prefix
    }

    pub fn asset_key_namespace(&self) -> &str {
        &self.inner().asset_key_namespace
    }

    pub fn asset_name_prefix(&self) -> &str {
        &self.inner().asset_name_prefix
    }

    pub fn media_index_key(&self) -> &str {
        &self.inner().media_index_key
    }

    pub fn index_write_strategy(&self) -> IndexWriteStrategy {
        self.inner().index_write_strategy
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| {
            matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConverterServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            log_format,
        };

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_MB);
        let max_stored_source_mb = env::var("MAX_STORED_SOURCE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_STORED_SOURCE_MB);

        let index_write_strategy = match env::var("INDEX_WRITE_STRATEGY") {
            Ok(raw) => raw.parse::<IndexWriteStrategy>()?,
            Err(_) => IndexWriteStrategy::Simple,
        };
        let index_write_strategy = match index_write_strategy {
            IndexWriteStrategy::CompareAndSwap { .. } => IndexWriteStrategy::CompareAndSwap {
                max_attempts: env::var("INDEX_CAS_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(INDEX_CAS_MAX_ATTEMPTS),
            },
            simple => simple,
        };

        let config = ConverterServiceConfig {
            base,
            storage_backend,
            s3_bucket: env_non_empty("S3_BUCKET"),
            s3_region: env_non_empty("S3_REGION"),
            s3_endpoint: env_non_empty("S3_ENDPOINT"),
            aws_region: env_non_empty("AWS_REGION"),
            public_media_url: env_non_empty("PUBLIC_MEDIA_URL"),
            local_storage_path: env_non_empty("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_non_empty("LOCAL_STORAGE_BASE_URL"),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            max_stored_source_bytes: max_stored_source_mb * 1024 * 1024,
            pandoc_path: env_non_empty("PANDOC_PATH").unwrap_or_else(|| "pandoc".to_string()),
            pandoc_timeout_secs: env::var("PANDOC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(PANDOC_TIMEOUT_SECS),
            fallback_converter_enabled: env_flag("FALLBACK_CONVERTER_ENABLED", true),
            scratch_dir_prefix: env_non_empty("SCRATCH_DIR_PREFIX")
                .unwrap_or_else(|| "aura-pandoc-".to_string()),
            asset_key_namespace: env_non_empty("ASSET_KEY_NAMESPACE")
                .unwrap_or_else(|| "uploads/pandoc".to_string()),
            asset_name_prefix: env_non_empty("ASSET_NAME_PREFIX")
                .unwrap_or_else(|| "aura-pandoc-word".to_string()),
            media_index_key: env_non_empty("MEDIA_INDEX_KEY")
                .unwrap_or_else(|| "media/index.json".to_string()),
            index_write_strategy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_MB must be greater than 0"));
        }
        if self.max_stored_source_bytes < self.max_upload_bytes {
            return Err(anyhow::anyhow!(
                "MAX_STORED_SOURCE_MB must be at least MAX_UPLOAD_MB"
            ));
        }
        if self.pandoc_timeout_secs == 0 {
            return Err(anyhow::anyhow!("PANDOC_TIMEOUT_SECS must be greater than 0"));
        }
        for (name, value) in [
            ("ASSET_KEY_NAMESPACE", &self.asset_key_namespace),
            ("MEDIA_INDEX_KEY", &self.media_index_key),
        ] {
            if value.contains("..") || value.starts_with('/') || value.is_empty() {
                return Err(anyhow::anyhow!(
                    "{} must be a relative key without '..' (got '{}')",
                    name,
                    value
                ));
            }
        }
        if let IndexWriteStrategy::CompareAndSwap { max_attempts } = self.index_write_strategy {
            if max_attempts == 0 {
                return Err(anyhow::anyhow!(
                    "INDEX_CAS_MAX_ATTEMPTS must be greater than 0"
                ));
            }
        }
        match self.storage_backend.unwrap_or(StorageBackend::S3) {
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
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }
        Ok(())
    }
}
