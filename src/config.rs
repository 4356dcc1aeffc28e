use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Storage credentials and region, taken from the environment.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Service configuration, loaded once at startup and injected into handlers
/// through the shared state.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// Bucket templates are fetched from and reports are written to.
    pub report_bucket: String,
    /// Endpoint notified when a report has been generated.
    pub notify_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_key = env::var("MY_AWS_ACCESS_KEY_ID")
            .map_err(|_| ConfigError::MissingVar("MY_AWS_ACCESS_KEY_ID"))?;
        let secret_key = env::var("MY_AWS_SECRET_ACCESS_KEY")
            .map_err(|_| ConfigError::MissingVar("MY_AWS_SECRET_ACCESS_KEY"))?;
        let region = env::var("MY_AWS_REGION").unwrap_or_else(|_| "ap-northeast-1".to_string());

        let host = env::var("SHEETFILL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SHEETFILL_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8000);

        let report_bucket = env::var("SHEETFILL_REPORT_BUCKET")
            .unwrap_or_else(|_| "my-excel-storage-bucket".to_string());
        let notify_url = env::var("SHEETFILL_NOTIFY_URL")
            .unwrap_or_else(|_| "https://example.com/notify".to_string());

        Ok(Config {
            host,
            port,
            storage: StorageConfig {
                access_key,
                secret_key,
                region,
            },
            report_bucket,
            notify_url,
        })
    }
}
