use std::env;
use std::path::PathBuf;
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// The application's configuration.
///
/// Built once at startup and injected by reference; business logic never
/// reads the environment directly.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Signing secret for short-lived access tokens.
    pub access_token_secret: Zeroizing<Vec<u8>>,
    /// Signing secret for long-lived session tokens.
    pub session_token_secret: Zeroizing<Vec<u8>>,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
    /// Session token lifetime in days.
    pub session_token_ttl_days: i64,
    /// Base URL of the object-storage provider.
    pub storage_endpoint: String,
    /// Bucket name at the storage provider.
    pub storage_bucket: String,
    /// API key presented to the storage provider.
    pub storage_api_key: String,
    /// Timeout for storage upload/delete calls, in seconds.
    pub storage_timeout_secs: u64,
    /// Directory where multipart uploads are staged before upload.
    pub temp_dir: PathBuf,
}

/// Decodes a 32-byte hex secret from the named environment variable.
fn secret_from_env(name: &str) -> Result<Zeroizing<Vec<u8>>> {
    let mut secret_hex = env::var(name)
        .with_context(|| format!("{} must be set (generate with: openssl rand -hex 32)", name))?;

    let secret_bytes = hex::decode(&secret_hex)
        .with_context(|| format!("{} must be valid hexadecimal", name))?;

    secret_hex.zeroize();

    if secret_bytes.len() != 32 {
        anyhow::bail!("{} must be exactly 32 bytes (64 hex characters)", name);
    }

    Ok(Zeroizing::new(secret_bytes))
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            access_token_secret: secret_from_env("ACCESS_TOKEN_SECRET")?,
            session_token_secret: secret_from_env("SESSION_TOKEN_SECRET")?,
            access_token_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_MINUTES")?,
            session_token_ttl_days: env::var("SESSION_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid SESSION_TOKEN_TTL_DAYS")?,
            storage_endpoint: env::var("STORAGE_ENDPOINT")
                .context("STORAGE_ENDPOINT must be set")?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "vidstream".to_string()),
            storage_api_key: env::var("STORAGE_API_KEY")
                .context("STORAGE_API_KEY must be set")?,
            storage_timeout_secs: env::var("STORAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid STORAGE_TIMEOUT_SECS")?,
            temp_dir: env::var("TEMP_DIR")
                .unwrap_or_else(|_| "uploads/tmp".to_string())
                .into(),
        })
    }
}
