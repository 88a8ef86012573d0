//! Run configuration, read from the environment once in `main` and passed
//! into the pipeline by value.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

/// Source of configuration variables. `std::env` in production, a map in tests.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Lookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

fn env_bool(vars: &impl Lookup, key: &str, default: bool) -> bool {
    vars.get(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(vars: &impl Lookup, key: &str, default: T) -> T {
    match vars.get(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("ignoring unparseable {}=`{}`, using default", key, raw);
            default
        }),
        None => default,
    }
}

fn env_duration_millis(vars: &impl Lookup, key: &str, default_millis: u64) -> Duration {
    Duration::from_millis(env_parsed(vars, key, default_millis))
}

fn env_string(vars: &impl Lookup, key: &str, default: &str) -> String {
    vars.get(key).unwrap_or_else(|| default.to_string())
}

fn env_required(vars: &impl Lookup, key: &'static str) -> Result<String, ConfigError> {
    vars.get(key).ok_or(ConfigError::Missing(key))
}

/// Parses an RFC 3339 cutoff such as `2025-12-26T00:00:00Z`.
pub fn parse_cutoff(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| ConfigError::Invalid {
            key: "CUTOFF_DATE",
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

/// Connection and execution settings for the notes service.
#[derive(Debug, Clone)]
pub struct MemosConfig {
    pub base_url: String,
    pub token: String,
    pub page_size: u32,
    pub request_timeout: Duration,
    /// Pause between consecutive mutating requests.
    pub delete_delay: Duration,
    pub visibility: String,
    pub dry_run: bool,
}

impl MemosConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(vars: &impl Lookup) -> Result<Self, ConfigError> {
        let base_url = env_required(vars, "MEMOS_URL")?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "MEMOS_URL",
                value: base_url,
                reason: "expected an http:// or https:// URL".into(),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: env_required(vars, "MEMOS_TOKEN")?,
            page_size: env_parsed(vars, "MEMOS_PAGE_SIZE", 100u32).max(1),
            request_timeout: env_duration_millis(vars, "MEMOS_TIMEOUT_MS", 30_000),
            delete_delay: env_duration_millis(vars, "MEMOS_DELETE_DELAY_MS", 100),
            visibility: env_string(vars, "MEMOS_VISIBILITY", "PRIVATE"),
            dry_run: env_bool(vars, "DRY_RUN", false),
        })
    }

    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: 100,
            request_timeout: Duration::from_secs(30),
            delete_delay: Duration::from_millis(100),
            visibility: "PRIVATE".to_string(),
            dry_run: false,
        }
    }
}

/// Settings for the `purge` job.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    pub cutoff: DateTime<Utc>,
}

impl PurgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(vars: &impl Lookup) -> Result<Self, ConfigError> {
        let raw = env_required(vars, "CUTOFF_DATE")?;
        Ok(Self {
            cutoff: parse_cutoff(&raw)?,
        })
    }
}

/// Settings for the `import` job.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub feed_path: Option<PathBuf>,
    /// Upper bound on scroll batches consumed from the source.
    pub max_batches: usize,
    pub video_tool: String,
    pub video_timeout: Duration,
    pub image_timeout: Duration,
    pub video_upload_timeout: Duration,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(vars: &impl Lookup) -> Self {
        Self {
            feed_path: vars.get("IMPORT_FEED_PATH").map(PathBuf::from),
            max_batches: env_parsed(vars, "MAX_SCROLLS", 10usize),
            video_tool: env_string(vars, "VIDEO_TOOL", "yt-dlp"),
            video_timeout: env_duration_millis(vars, "VIDEO_TIMEOUT_MS", 60_000),
            image_timeout: env_duration_millis(vars, "IMAGE_TIMEOUT_MS", 15_000),
            video_upload_timeout: env_duration_millis(vars, "VIDEO_UPLOAD_TIMEOUT_MS", 120_000),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_lookup(&|_: &str| -> Option<String> { None })
    }
}
