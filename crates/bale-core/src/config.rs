use std::{env, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://tapi.bale.ai";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bale_bot_token: String,
    pub api_base_url: String,

    // Polling
    pub poll_timeout: Duration,
    pub http_timeout: Duration,
    pub poll_retry_delay: Duration,
    /// Consecutive failed fetches after which the loop gives up. `None` retries forever.
    pub poll_max_retries: Option<u32>,

    // Verification job
    pub job_interval: Duration,
    pub job_max_duration: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bale_bot_token = env_str("BALE_BOT_TOKEN").unwrap_or_default();
        if bale_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BALE_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base_url = env_str("BALE_API_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let poll_timeout = Duration::from_secs(env_u64("POLL_TIMEOUT_SECS").unwrap_or(60));
        // The HTTP timeout has to outlive the long poll, or every idle poll becomes a failure.
        let http_timeout = env_u64("HTTP_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(poll_timeout + Duration::from_secs(10));
        if http_timeout <= poll_timeout {
            return Err(Error::Config(format!(
                "HTTP_TIMEOUT_SECS ({}s) must exceed POLL_TIMEOUT_SECS ({}s)",
                http_timeout.as_secs(),
                poll_timeout.as_secs()
            )));
        }
        let poll_retry_delay =
            Duration::from_millis(env_u64("POLL_RETRY_DELAY_MS").unwrap_or(1000));
        let poll_max_retries = env_u32("POLL_MAX_RETRIES").filter(|n| *n > 0);

        let job_interval = Duration::from_secs(env_u64("JOB_INTERVAL_SECS").unwrap_or(15));
        let job_max_duration =
            Duration::from_secs(env_u64("JOB_MAX_DURATION_SECS").unwrap_or(15 * 60));
        if job_interval.is_zero() {
            return Err(Error::Config(
                "JOB_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bale_bot_token,
            api_base_url,
            poll_timeout,
            http_timeout,
            poll_retry_delay,
            poll_max_retries,
            job_interval,
            job_max_duration,
        })
    }

    /// Config with the given token and every other field at its default.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bale_bot_token: token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_timeout: Duration::from_secs(60),
            http_timeout: Duration::from_secs(70),
            poll_retry_delay: Duration::from_secs(1),
            poll_max_retries: None,
            job_interval: Duration::from_secs(15),
            job_max_duration: Duration::from_secs(15 * 60),
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to load environment file"),
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
