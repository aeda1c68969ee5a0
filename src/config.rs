use crate::error::{ClientError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl AppConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("VOICE_ASSISTANT_BACKEND_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let data_dir = lookup("VOICE_ASSISTANT_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".voice-assistant"));

        let request_timeout = match lookup("VOICE_ASSISTANT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|err| {
                    ClientError::Config(format!(
                        "VOICE_ASSISTANT_TIMEOUT_SECS must be a whole number of seconds: {err}"
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            backend_url,
            data_dir,
            request_timeout,
            log_format,
        })
    }
}
