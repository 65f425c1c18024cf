use std::path::PathBuf;

use anyhow::{Context, Result};

/// Uploads larger than this are refused before any storage call.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Upscale factor applied to page 1 when building the preview image.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Where uploaded PDFs and rendered previews live.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    S3 {
        bucket: String,
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
    },
    Local {
        root: PathBuf,
    },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    /// `None` keeps resume records in process memory.
    pub redis_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub render_scale: f32,
    pub llm_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage = match optional_env("STORAGE_BACKEND").as_deref() {
            None | Some("s3") => StorageBackend::S3 {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            },
            Some("local") => StorageBackend::Local {
                root: optional_env("LOCAL_STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data")),
            },
            Some(other) => anyhow::bail!("STORAGE_BACKEND must be 's3' or 'local', got '{other}'"),
        };

        Ok(Config {
            storage,
            redis_url: optional_env("REDIS_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            render_scale: parse_env("RENDER_SCALE", DEFAULT_RENDER_SCALE)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Local-only configuration used by router tests.
    pub fn for_tests(root: PathBuf) -> Self {
        Config {
            storage: StorageBackend::Local { root },
            redis_url: None,
            anthropic_api_key: "test-key".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            render_scale: DEFAULT_RENDER_SCALE,
            llm_timeout_secs: 5,
        }
    }
}
