//! CouchPotato API client
//!
//! CouchPotato exposes commands as GET endpoints under
//! `{base}/api/{api_key}/{command}`. Only the two movie-searcher commands
//! are used here: one to kick off a full search of wanted movies and one to
//! query its progress.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::config::CouchPotatoConfig;

/// Command that starts a full search for all wanted movies
pub const FULL_SEARCH_COMMAND: &str = "movie.searcher.full_search";

/// Command that reports progress of the running search
pub const PROGRESS_COMMAND: &str = "movie.searcher.progress";

/// Decoded state of the remote movie searcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressSnapshot {
    /// The server reported `{"movie": false}`: nothing is being searched
    NoActiveJob,
    /// A search is running; `to_go` of `total` movies remain
    Active { total: f64, to_go: f64 },
}

/// Seam between the poll loop and the wire, so the loop can be driven by a
/// scripted fake in tests.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Kick off a full search of all wanted movies. `Err` for any non-200
    /// response or transport failure; the body is ignored.
    async fn start_full_search(&self) -> Result<()>;

    /// Query progress of the running search. `Err` covers non-200
    /// responses, transport failures, and undecodable or invalid bodies.
    async fn fetch_progress(&self) -> Result<ProgressSnapshot>;
}

/// Wire shape of the progress endpoint. The `movie` field is either the
/// literal `false` (no active search) or an object with the counters.
#[derive(Debug, Deserialize)]
struct ProgressResponse {
    movie: MovieField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MovieField {
    Idle(bool),
    Searching(MovieSearchProgress),
}

#[derive(Debug, Deserialize)]
struct MovieSearchProgress {
    total: f64,
    to_go: f64,
}

/// CouchPotato HTTP client, scoped to one task execution
pub struct CouchPotatoClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CouchPotatoClient {
    pub fn new(config: &CouchPotatoConfig) -> Self {
        // The configured URL may or may not carry a trailing slash
        let base_url = config
            .server_url
            .strip_suffix('/')
            .unwrap_or(&config.server_url)
            .to_string();

        Self {
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        }
    }

    /// Build the URL for an API command. The API key goes into the path
    /// verbatim, matching what CouchPotato expects.
    fn command_url(&self, command: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_key, command)
    }
}

#[async_trait]
impl SearchApi for CouchPotatoClient {
    async fn start_full_search(&self) -> Result<()> {
        let url = self.command_url(FULL_SEARCH_COMMAND);
        info!(url = %url, "Calling CouchPotato full search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to call full search endpoint")?;

        if response.status() != StatusCode::OK {
            bail!("Full search returned status {}", response.status());
        }

        Ok(())
    }

    async fn fetch_progress(&self) -> Result<ProgressSnapshot> {
        let url = self.command_url(PROGRESS_COMMAND);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to call progress endpoint")?;

        if response.status() != StatusCode::OK {
            bail!("Progress returned status {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read progress body")?;

        decode_progress(&body)
    }
}

/// Decode a progress body into a snapshot. The `{"movie": false}` sentinel
/// is part of the wire enum, so it can never be mistaken for a decode
/// failure.
fn decode_progress(body: &str) -> Result<ProgressSnapshot> {
    let decoded: ProgressResponse =
        serde_json::from_str(body).context("Failed to parse progress response")?;

    match decoded.movie {
        MovieField::Idle(false) => Ok(ProgressSnapshot::NoActiveJob),
        MovieField::Idle(true) => bail!("Unexpected progress payload: {body}"),
        MovieField::Searching(progress) => Ok(ProgressSnapshot::Active {
            total: progress.total,
            to_go: progress.to_go,
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    fn client(server_url: &str) -> CouchPotatoClient {
        CouchPotatoClient::new(&CouchPotatoConfig {
            server_url: server_url.to_string(),
            api_key: "abc123".to_string(),
            poll_interval_secs: 5,
        })
    }

    #[test]
    fn test_command_url_strips_trailing_slash() {
        let client = client("http://host:5050/");
        assert_eq!(
            client.command_url(PROGRESS_COMMAND),
            "http://host:5050/api/abc123/movie.searcher.progress"
        );
    }

    #[test]
    fn test_command_url_without_trailing_slash() {
        let client = client("http://host:5050");
        assert_eq!(
            client.command_url(FULL_SEARCH_COMMAND),
            "http://host:5050/api/abc123/movie.searcher.full_search"
        );
    }

    #[test]
    fn test_decode_no_active_job_sentinel() {
        let snapshot = decode_progress(r#"{"movie": false}"#).unwrap();
        assert_eq!(snapshot, ProgressSnapshot::NoActiveJob);
    }

    #[test]
    fn test_decode_active_search() {
        let snapshot =
            decode_progress(r#"{"movie": {"total": 71, "to_go": 47}}"#).unwrap();
        assert_matches!(
            snapshot,
            ProgressSnapshot::Active { total, to_go } if total == 71.0 && to_go == 47.0
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let body = r#"{"movie": {"total": 10, "to_go": 2, "success": true}}"#;
        assert_matches!(
            decode_progress(body).unwrap(),
            ProgressSnapshot::Active { total, to_go } if total == 10.0 && to_go == 2.0
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_progress("not json").is_err());
        assert!(decode_progress(r#"{"movie": true}"#).is_err());
        assert!(decode_progress(r#"{"movie": {"total": 10}}"#).is_err());
        assert!(decode_progress("{}").is_err());
    }
}
