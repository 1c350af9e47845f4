use std::collections::HashSet;
use std::env;
use anyhow::{Result, Context};
use once_cell::sync::Lazy;
use tracing::{info, warn};

/// Immutable service configuration. One instance is handed to the
/// Validator and the ConversionService, so tests can run either against
/// alternate policies without touching process state.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub max_filename_length: usize,
    pub default_quality: u8,
    pub max_dimension: u32,
}

// Global API keys loaded from environment
pub static VALID_API_KEYS: Lazy<HashSet<String>> = Lazy::new(|| {
    env::var("VALID_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
});

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: Self::parse_env_var("SERVER_PORT", 8080)
                .context("Failed to parse SERVER_PORT")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", 10)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_concurrent_requests: Self::parse_env_var("MAX_CONCURRENT_REQUESTS", 100)
                .context("Failed to parse MAX_CONCURRENT_REQUESTS")?,
            max_filename_length: Self::parse_env_var("MAX_FILENAME_LENGTH", 255)
                .context("Failed to parse MAX_FILENAME_LENGTH")?,
            default_quality: Self::parse_env_var("DEFAULT_QUALITY", 90)
                .context("Failed to parse DEFAULT_QUALITY")?,
            max_dimension: Self::parse_env_var("MAX_DIMENSION", 10_000)
                .context("Failed to parse MAX_DIMENSION")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Byte ceiling for a single upload.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => Ok(default),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if self.max_filename_length == 0 {
            return Err(anyhow::anyhow!("MAX_FILENAME_LENGTH must be greater than 0"));
        }
        if self.default_quality == 0 || self.default_quality > 100 {
            return Err(anyhow::anyhow!("DEFAULT_QUALITY must be between 1 and 100"));
        }
        if self.max_dimension == 0 {
            return Err(anyhow::anyhow!("MAX_DIMENSION must be greater than 0"));
        }
        Ok(())
    }

    /// Log how the service is gated. Open mode (no keys) is legitimate for
    /// a browser-facing deployment but worth a warning.
    pub fn report_auth_mode() {
        if VALID_API_KEYS.is_empty() {
            warn!("No API keys configured; running in open mode. Set VALID_API_KEYS to restrict access.");
        } else {
            info!("Loaded {} valid API keys", VALID_API_KEYS.len());
        }
    }

    pub fn auth_enabled() -> bool {
        !VALID_API_KEYS.is_empty()
    }

    pub fn validate_api_key(key: &str) -> bool {
        VALID_API_KEYS.contains(key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            max_file_size_mb: 10,
            max_concurrent_requests: 100,
            max_filename_length: 255,
            default_quality: 90,
            max_dimension: 10_000,
        }
    }
}
