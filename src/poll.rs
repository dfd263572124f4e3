use log::{debug, warn};
use std::time::Duration;

use crate::api::{ApiError, SumoClient};
use crate::query::SearchSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Gathering,
    /// At least one message is available; the job may still be running.
    Matched,
    Done,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Submitted | JobState::Gathering)
    }

    /// Whether messages should be read after the loop exits in this state.
    pub fn has_results(self) -> bool {
        matches!(self, JobState::Matched | JobState::Done)
    }
}

/// A job created on the backend. Owned by the run that submitted it.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub id: String,
    pub spec: SearchSpec,
    pub state: JobState,
    pub message_count: u64,
}

impl SearchJob {
    pub fn submitted(id: String, spec: SearchSpec) -> Self {
        Self {
            id,
            spec,
            state: JobState::Submitted,
            message_count: 0,
        }
    }
}

/// Sleeps `interval` before every status check until the job reaches a
/// terminal state. Transport and backend errors leave it `Failed`.
pub async fn poll_job(
    client: &SumoClient,
    job: &mut SearchJob,
    interval: Duration,
) -> Result<JobState, ApiError> {
    while !job.state.is_terminal() {
        tokio::time::sleep(interval).await;

        let status = match client.status(&job.id).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Error getting status of job {}: {}", job.id, e);
                job.state = JobState::Failed;
                return Err(e);
            }
        };

        for pending in &status.pending_errors {
            warn!("Job {} reported error: {}", job.id, pending);
        }

        job.message_count = status.message_count;
        job.state = if status.is_done() {
            JobState::Done
        } else if status.message_count >= 1 {
            JobState::Matched
        } else if status.is_cancelled() {
            warn!("Search job {} was cancelled.", job.id);
            JobState::Cancelled
        } else {
            debug!(
                "Job {} ({}) state: {}, messages: {}",
                job.id, job.spec.window, status.state, status.message_count
            );
            JobState::Gathering
        };
    }
    Ok(job.state)
}
