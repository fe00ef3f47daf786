//! Application configuration management

use std::env;

use anyhow::{Context, Result};

/// Connection settings for the CouchPotato server.
///
/// Immutable for the duration of one task execution. The URL may carry a
/// trailing slash; the client strips it before building request URLs.
#[derive(Debug, Clone)]
pub struct CouchPotatoConfig {
    /// Base URL of the CouchPotato server, e.g. `http://host:5050`
    pub server_url: String,

    /// API key, inserted verbatim into the URL path (not escaped)
    pub api_key: String,

    /// Seconds to wait between progress polls
    pub poll_interval_secs: u64,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// CouchPotato connection settings. `None` when the URL or API key is
    /// not configured; the daemon still starts and the search task fails
    /// fast when it is triggered.
    pub couchpotato: Option<CouchPotatoConfig>,

    /// Cron schedule (6-field) for the wanted search. `None` disables
    /// scheduling; the task can still be run with `--once`.
    pub search_schedule: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let server_url = env::var("COUCHPOTATO_URL").ok();
        let api_key = env::var("COUCHPOTATO_API_KEY").ok();

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Invalid POLL_INTERVAL_SECS")?;

        let couchpotato = match (server_url, api_key) {
            (Some(server_url), Some(api_key)) => Some(CouchPotatoConfig {
                server_url,
                api_key,
                poll_interval_secs,
            }),
            _ => None,
        };

        Ok(Self {
            couchpotato,
            search_schedule: env::var("SEARCH_SCHEDULE").ok(),
        })
    }
}
