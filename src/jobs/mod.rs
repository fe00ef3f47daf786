//! Background job scheduling and workers

pub mod search_wanted;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Terminal failures a task can report to the host. Everything else a task
/// hits internally is absorbed and logged, never surfaced.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task configuration is missing")]
    ConfigurationMissing,

    #[error("aborted after {failures} failed progress polls")]
    ExcessiveFailures { failures: u32 },

    #[error("cancelled")]
    Cancelled,
}

/// Cron trigger a task suggests to the scheduler
#[derive(Debug, Clone)]
pub struct TaskTrigger {
    pub cron: String,
}

/// A background task the scheduler can run.
///
/// Metadata identifies the task to the host; `execute` drives one complete
/// run, reporting fractional progress in `[0, 100]` through the sink.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Stable identifying key
    fn key(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Category label for grouping in the host
    fn category(&self) -> &'static str;

    /// Triggers to install when no schedule is configured. Empty means the
    /// host alone decides when the task runs.
    fn default_triggers(&self) -> Vec<TaskTrigger> {
        Vec::new()
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<(), TaskError>;
}

/// Run one task execution, logging its outcome. Task failures stop here;
/// the scheduler never sees them.
pub async fn run_task(task: Arc<dyn ScheduledTask>, cancel: CancellationToken) {
    let key = task.key();
    info!(task = key, name = task.name(), "Running scheduled task");

    let report = move |value: f64| {
        info!(task = key, progress = value, "Task progress");
    };

    match task.execute(cancel, &report).await {
        Ok(()) => info!(task = key, "Task finished"),
        Err(TaskError::Cancelled) => warn!(task = key, "Task cancelled"),
        Err(e) => error!(task = key, error = %e, "Task failed"),
    }
}

/// Initialize and start the job scheduler.
///
/// A configured schedule overrides the task's own default triggers. With
/// neither, the task only runs when invoked manually.
pub async fn start_scheduler(
    task: Arc<dyn ScheduledTask>,
    schedule: Option<String>,
    cancel: CancellationToken,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let triggers = match schedule {
        Some(cron) => vec![TaskTrigger { cron }],
        None => task.default_triggers(),
    };

    if triggers.is_empty() {
        warn!(
            task = task.key(),
            "No schedule configured; task will only run when triggered manually"
        );
    }

    for trigger in &triggers {
        let job_task = task.clone();
        let job_cancel = cancel.clone();
        let job = Job::new_async(trigger.cron.as_str(), move |_uuid, _l| {
            let task = job_task.clone();
            let cancel = job_cancel.clone();
            Box::pin(async move {
                run_task(task, cancel.child_token()).await;
            })
        })?;
        scheduler.add(job).await?;
    }

    scheduler.start().await?;

    info!("Job scheduler started");
    Ok(scheduler)
}
