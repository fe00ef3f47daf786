//! Wanted-movie search job
//!
//! Triggers a full search of all wanted movies on CouchPotato, then polls
//! the searcher's progress endpoint until the search completes. The poll
//! loop tolerates transient failures (the server can be briefly
//! unreachable during a long search) but gives up after sustained failure
//! instead of polling forever. Whatever happens, the host gets exactly one
//! terminal progress report of 100.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::CouchPotatoConfig;
use crate::jobs::{ScheduledTask, TaskError};
use crate::services::{CouchPotatoClient, ProgressSnapshot, SearchApi};

/// Poll failures tolerated before the task gives up. Failures accumulate
/// over the whole execution and never reset.
const MAX_POLL_FAILURES: u32 = 10;

/// Outcome of interpreting a single progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// Percentage of wanted movies searched so far
    Percent(f64),
    /// The snapshot was unusable; counts toward the failure limit
    Failure,
}

/// Turn a snapshot into a poll outcome.
///
/// `NoActiveJob` means the searcher already finished (or never started),
/// so it maps straight to 100. A snapshot with a non-positive total, or
/// one producing a non-finite or negative percentage, maps to `Failure`
/// rather than letting NaN or out-of-range values into the loop.
pub fn poll_outcome(snapshot: ProgressSnapshot) -> PollOutcome {
    match snapshot {
        ProgressSnapshot::NoActiveJob => PollOutcome::Percent(100.0),
        ProgressSnapshot::Active { total, to_go } => {
            if total <= 0.0 {
                return PollOutcome::Failure;
            }
            let percent = (total - to_go) / total * 100.0;
            if !percent.is_finite() || percent < 0.0 {
                return PollOutcome::Failure;
            }
            PollOutcome::Percent(percent)
        }
    }
}

/// Scheduled task that searches for all wanted movies
pub struct SearchWantedTask {
    config: Option<CouchPotatoConfig>,
}

impl SearchWantedTask {
    pub const KEY: &'static str = "cp_search_wanted";

    /// Configuration is injected by the host. `None` is accepted here so a
    /// misconfigured daemon still constructs; `execute` then fails fast.
    pub fn new(config: Option<CouchPotatoConfig>) -> Self {
        Self { config }
    }

    /// Trigger the search and poll it to completion.
    ///
    /// Returns `Ok` when the search finished or when the trigger itself
    /// failed (a dead server means there is nothing to wait for, and the
    /// host still expects the task to complete). Cancellation is observed
    /// during the inter-poll delay; an in-flight request is never
    /// interrupted.
    async fn run<A: SearchApi + ?Sized>(
        &self,
        api: &A,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), TaskError> {
        if let Err(e) = api.start_full_search().await {
            error!(task = Self::KEY, error = %e, "Failed to trigger full search");
            return Ok(());
        }

        let mut failures: u32 = 0;
        let mut progress = 0.0_f64;

        while progress < 100.0 {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => return Err(TaskError::Cancelled),
            }

            match api.fetch_progress().await {
                Ok(snapshot) => match poll_outcome(snapshot) {
                    PollOutcome::Percent(percent) => {
                        debug!(task = Self::KEY, progress = percent, "Search progress");
                        // The remote reports whatever it likes; no
                        // monotonicity is guaranteed.
                        progress = percent;
                    }
                    PollOutcome::Failure => {
                        failures += 1;
                        warn!(task = Self::KEY, failures, "Unusable progress snapshot");
                    }
                },
                Err(e) => {
                    failures += 1;
                    warn!(task = Self::KEY, failures, error = %e, "Progress poll failed");
                }
            }

            if failures > MAX_POLL_FAILURES {
                error!(
                    task = Self::KEY,
                    failures, "Giving up after repeated poll failures"
                );
                return Err(TaskError::ExcessiveFailures { failures });
            }
        }

        Ok(())
    }

    async fn execute_with_api<A: SearchApi + ?Sized>(
        &self,
        api: &A,
        interval: Duration,
        cancel: &CancellationToken,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<(), TaskError> {
        let result = self.run(api, interval, cancel).await;

        // Terminal report on every exit path, abort and cancellation
        // included; the host completion contract requires it.
        progress(100.0);
        result
    }
}

#[async_trait]
impl ScheduledTask for SearchWantedTask {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        "Search wanted"
    }

    fn description(&self) -> &'static str {
        "Search for wanted movies"
    }

    fn category(&self) -> &'static str {
        "CouchPotato"
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<(), TaskError> {
        let config = self
            .config
            .as_ref()
            .ok_or(TaskError::ConfigurationMissing)?;

        // Fresh client per execution, dropped on every exit path
        let client = CouchPotatoClient::new(config);
        let interval = Duration::from_secs(config.poll_interval_secs);

        self.execute_with_api(&client, interval, &cancel, progress)
            .await
    }
}
