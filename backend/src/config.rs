//! Startup configuration, read from environment variables.

use crate::errors::ApiError;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub data_dir: PathBuf,
    pub api_key: String,
    /// `None` keeps pending reveals until a callback arrives.
    pub reveal_ttl: Option<chrono::Duration>,
    pub oracle_poll: Duration,
    /// `None` draws a fresh oracle key at startup.
    pub oracle_seed: Option<[u8; 32]>,
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let reveal_ttl = get("REVEAL_TTL_SECS")
            .map(|v| parse_u64("REVEAL_TTL_SECS", &v))
            .transpose()?
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .ok_or_else(|| ApiError::Config("REVEAL_TTL_SECS out of range".to_string()))
            })
            .transpose()?;

        let oracle_poll = get("ORACLE_POLL_MS")
            .map(|v| parse_u64("ORACLE_POLL_MS", &v))
            .transpose()?
            .unwrap_or(250);

        let oracle_seed = get("ORACLE_SEED_HEX")
            .map(|v| {
                let bytes = hex::decode(v.trim())
                    .map_err(|_| ApiError::Config("ORACLE_SEED_HEX must be hex".to_string()))?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| ApiError::Config("ORACLE_SEED_HEX must be 32 bytes".to_string()))
            })
            .transpose()?;

        Ok(Self {
            addr: get("BACKEND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            // In production, this should be a strong secret from the environment.
            api_key: get("API_KEY").unwrap_or_else(|| "dev-secret-key".to_string()),
            reveal_ttl,
            oracle_poll: Duration::from_millis(oracle_poll.max(1)),
            oracle_seed,
        })
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{key} must be a non-negative integer")))
}
