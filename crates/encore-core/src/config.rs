//! Configuration module.
//!
//! All configuration comes from the environment (with `.env` support via
//! dotenvy). Defaults live here as consts; [`Config::validate`] covers the
//! cross-field rules that a bad deployment would otherwise only hit at
//! runtime.

use std::env;

const DEFAULT_PORT: u16 = 8081;
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const POOL_CONCURRENCY: usize = 5;
const POOL_QUEUE_SIZE: usize = 50;
const SCHEDULER_INTERVAL_SECS: u64 = 30;
const STUCK_THRESHOLD_MINS: u64 = 10;
const THUMBNAIL_MAX_CONCURRENT: usize = 4;

/// Worker pool / scheduler settings for one background pipeline.
#[derive(Clone, Debug)]
pub struct ConcurrencyConfig {
    pub concurrency: usize,
    pub queue_size: usize,
    pub interval_secs: u64,
    pub stuck_threshold_mins: u64,
}

/// Object store (S3-compatible) settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (Spaces, MinIO). None = AWS.
    pub endpoint: Option<String>,
    /// Public base URL for uploaded objects (CDN in front of the bucket).
    pub cdn_url: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage: StorageConfig,
    pub jobs: ConcurrencyConfig,
    pub thumbnail_max_concurrent: usize,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let storage = StorageConfig {
            bucket: env::var("S3_BUCKET")
                .map_err(|_| anyhow::anyhow!("S3_BUCKET must be set"))?,
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            cdn_url: env::var("CDN_URL")
                .map_err(|_| anyhow::anyhow!("CDN_URL must be set"))?,
        };

        let jobs = ConcurrencyConfig {
            concurrency: parse_env("POOL_CONCURRENCY", POOL_CONCURRENCY),
            queue_size: parse_env("POOL_QUEUE_SIZE", POOL_QUEUE_SIZE),
            interval_secs: parse_env("SCHEDULER_INTERVAL_SECS", SCHEDULER_INTERVAL_SECS),
            stuck_threshold_mins: parse_env("STUCK_THRESHOLD_MINS", STUCK_THRESHOLD_MINS),
        };

        let config = Config {
            server_port: parse_env("PORT", DEFAULT_PORT),
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: parse_env("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            storage,
            jobs,
            thumbnail_max_concurrent: parse_env(
                "THUMBNAIL_MAX_CONCURRENT",
                THUMBNAIL_MAX_CONCURRENT,
            ),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a PostgreSQL connection string"
            ));
        }

        if self.jobs.concurrency == 0 {
            return Err(anyhow::anyhow!("POOL_CONCURRENCY must be at least 1"));
        }
        if self.jobs.queue_size == 0 {
            return Err(anyhow::anyhow!("POOL_QUEUE_SIZE must be at least 1"));
        }
        if self.thumbnail_max_concurrent == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_MAX_CONCURRENT must be at least 1"));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
