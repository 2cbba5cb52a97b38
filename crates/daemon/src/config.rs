//! Daemon configuration
//!
//! Read once from the environment at startup and handed to the adapters.

use anyhow::{bail, Context, Result};
use lexcompare_api_rpc::server::DEFAULT_RPC_PORT;
use lexcompare_api_rpc::{DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_RATE};
use lexcompare_core::application::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};
use lexcompare_core::application::RetryConfig;
use lexcompare_infra_gemini::GeminiConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "~/.lexcompare/data";
const DEFAULT_DEMO_DIR: &str = "~/.lexcompare/demo";
const DEFAULT_DB_PATH: &str = "~/.lexcompare/meta.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub demo_dir: PathBuf,
    pub db_path: String,
    pub rpc_port: u16,
    pub retry: RetryConfig,
    pub gemini: GeminiConfig,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
    pub log_format: LogFormat,
    /// Daily-rotated log files are written here when set
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, default: &str| -> PathBuf {
            let raw = var(key).unwrap_or_else(|| default.to_string());
            PathBuf::from(shellexpand::tilde(&raw).into_owned())
        };

        let api_key = match var("GOOGLE_API_KEY") {
            Some(key) => key,
            None => bail!("GOOGLE_API_KEY must be set"),
        };

        let mut gemini = GeminiConfig::new(api_key);
        if let Some(model) = var("GEMINI_MODEL") {
            gemini = gemini.with_model(model);
        }
        if let Some(base_url) = var("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(base_url);
        }
        if let Some(secs) = parse::<u64>(&var, "GEMINI_TIMEOUT_SECS")? {
            gemini = gemini.with_timeout(Duration::from_secs(secs));
        }

        let base_delay = parse::<u64>(&var, "LEXCOMPARE_RETRY_BASE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_BASE_DELAY);
        let max_attempts =
            parse::<u32>(&var, "LEXCOMPARE_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            bail!("LEXCOMPARE_MAX_ATTEMPTS must be at least 1");
        }

        let log_format = match var("LEXCOMPARE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            data_dir: path("LEXCOMPARE_DATA_DIR", DEFAULT_DATA_DIR),
            demo_dir: path("LEXCOMPARE_DEMO_DIR", DEFAULT_DEMO_DIR),
            db_path: path("LEXCOMPARE_DB_PATH", DEFAULT_DB_PATH)
                .to_string_lossy()
                .into_owned(),
            rpc_port: parse(&var, "LEXCOMPARE_RPC_PORT")?.unwrap_or(DEFAULT_RPC_PORT),
            retry: RetryConfig {
                max_attempts,
                base_delay,
            },
            gemini,
            rate_limit_burst: parse(&var, "LEXCOMPARE_RATE_LIMIT_BURST")?
                .unwrap_or(DEFAULT_RATE_LIMIT_BURST),
            rate_limit_rate: parse(&var, "LEXCOMPARE_RATE_LIMIT_RATE")?
                .unwrap_or(DEFAULT_RATE_LIMIT_RATE),
            log_format,
            log_dir: var("LEXCOMPARE_LOG_DIR")
                .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned())),
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}
