use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Result};
use tracing::info;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub ai_timeout: Duration,
    pub ai_max_attempts: u32,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ai_max_attempts: u32 = try_load(&lookup, "AI_MAX_ATTEMPTS", "2")?;
        if ai_max_attempts == 0 {
            bail!("AI_MAX_ATTEMPTS must be at least 1");
        }
        let timeout_secs: u64 = try_load(&lookup, "AI_TIMEOUT_SECS", "60")?;
        if timeout_secs == 0 {
            bail!("AI_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", "8080")?,
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_api_base: try_load(&lookup, "GEMINI_API_BASE", DEFAULT_GEMINI_BASE)?,
            text_model: try_load(&lookup, "GEMINI_TEXT_MODEL", "gemini-2.0-flash")?,
            image_model: try_load(&lookup, "GEMINI_IMAGE_MODEL", "gemini-2.0-flash-preview-image-generation")?,
            ai_timeout: Duration::from_secs(timeout_secs),
            ai_max_attempts,
            data_dir: try_load(&lookup, "DATA_DIR", "./data")?,
        })
    }

    /// Describes the API key for logs without revealing any of it.
    pub fn api_key_summary(&self) -> Option<String> {
        self.gemini_api_key.as_ref().map(|k| format!("set ({} chars)", k.chars().count()))
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value '{raw}': {e}"))
}
