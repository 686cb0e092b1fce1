//! Explicit configuration for the pipelines.
//!
//! Nothing below reads the environment. [`crate::cli`] gathers flags and
//! environment variables once and the constructors here turn them into plain
//! structs that are passed down into each pipeline.

use crate::cli::Cli;
use std::time::Duration;

/// Hard cap on meeting-list pages visited per committee.
pub const DEFAULT_PAGE_CAP: usize = 50;
/// Pause after each meeting-list page fetched.
pub const DEFAULT_POLITE_DELAY_MS: u64 = 500;
/// Per-request HTTP timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Requests per minute allowed against the generative-AI service.
pub const DEFAULT_RATE_LIMIT: u32 = 60;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Characters of minutes text included in each prompt.
pub const DEFAULT_PROMPT_CHARS: usize = 8000;

/// Transport settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Meeting-list crawl settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum number of list pages fetched in one crawl.
    pub page_cap: usize,
    /// Delay awaited after every fetched page.
    pub polite_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_cap: DEFAULT_PAGE_CAP,
            polite_delay: Duration::from_millis(DEFAULT_POLITE_DELAY_MS),
        }
    }
}

/// Generative-AI settings for attendance extraction.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub api_key: String,
    pub model: String,
    pub requests_per_minute: u32,
    pub prompt_chars: usize,
}

impl GenAiConfig {
    /// Fixed wait between consecutive model calls, `ceil(60000 / rpm)` ms.
    ///
    /// A rate of zero falls back to [`DEFAULT_RATE_LIMIT`].
    pub fn call_interval(&self) -> Duration {
        let rpm = if self.requests_per_minute == 0 {
            DEFAULT_RATE_LIMIT
        } else {
            self.requests_per_minute
        };
        Duration::from_millis(60_000u64.div_ceil(rpm as u64))
    }
}

impl HttpConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            timeout: Duration::from_secs(cli.timeout_secs),
            ..Self::default()
        }
    }
}

impl CrawlConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            page_cap: cli.page_cap,
            polite_delay: Duration::from_millis(cli.delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genai(rpm: u32) -> GenAiConfig {
        GenAiConfig {
            api_key: "k".to_string(),
            model: DEFAULT_MODEL.to_string(),
            requests_per_minute: rpm,
            prompt_chars: DEFAULT_PROMPT_CHARS,
        }
    }

    #[test]
    fn test_call_interval_rounds_up() {
        assert_eq!(genai(60).call_interval(), Duration::from_millis(1000));
        assert_eq!(genai(7).call_interval(), Duration::from_millis(8572));
        assert_eq!(genai(15).call_interval(), Duration::from_millis(4000));
        assert_eq!(genai(120_000).call_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_call_interval_zero_uses_default() {
        assert_eq!(genai(0).call_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_crawl_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.page_cap, 50);
        assert_eq!(config.polite_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_http_default_user_agent() {
        let config = HttpConfig::default();
        assert!(config.user_agent.starts_with("council_minutes/"));
    }
}
