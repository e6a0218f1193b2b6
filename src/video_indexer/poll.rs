//! Job state polling with a bounded deadline.

use crate::error::{GuardianError, Result};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

/// State of an indexing job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Quarantined,
    /// Any state string the client does not know; treated as still running.
    Other(String),
}

impl JobState {
    /// Parse a service state string.
    pub fn parse(state: &str) -> Self {
        match state {
            "Uploaded" => JobState::Uploaded,
            "Processing" => JobState::Processing,
            "Processed" => JobState::Processed,
            "Failed" => JobState::Failed,
            "Quarantined" => JobState::Quarantined,
            other => JobState::Other(other.to_string()),
        }
    }

    /// Whether polling should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Processed | JobState::Failed | JobState::Quarantined)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Uploaded => write!(f, "Uploaded"),
            JobState::Processing => write!(f, "Processing"),
            JobState::Processed => write!(f, "Processed"),
            JobState::Failed => write!(f, "Failed"),
            JobState::Quarantined => write!(f, "Quarantined"),
            JobState::Other(s) if s.is_empty() => write!(f, "<missing>"),
            JobState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One status observation: the job state plus the full response payload.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub state: JobState,
    pub payload: Value,
}

impl JobStatus {
    /// Build a status from a service response, reading its `state` field.
    pub fn from_payload(payload: Value) -> Self {
        let state = JobState::parse(payload.get("state").and_then(Value::as_str).unwrap_or(""));
        Self { state, payload }
    }
}

/// Fixed-interval polling with a total deadline.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(3600))
    }
}

/// Poll `fetch` until the job reaches a terminal state or the deadline passes.
///
/// `Processed` yields the payload. `Failed` and `Quarantined` map to distinct errors,
/// and running out of time yields [`GuardianError::IndexingTimeout`]. The loop never
/// sleeps past the deadline.
pub async fn poll_until_terminal<F, Fut>(
    job_id: &str,
    policy: &PollPolicy,
    mut fetch: F,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let status = fetch().await?;
        debug!(attempt, state = %status.state, "Polled indexing job {}", job_id);

        match status.state {
            JobState::Processed => {
                info!("Indexing job {} processed after {} poll(s)", job_id, attempt);
                return Ok(status.payload);
            }
            JobState::Failed => {
                let detail = failure_message(&status.payload)
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default();
                return Err(GuardianError::Indexing(format!(
                    "Video Indexing Failed in Azure (job {}){}",
                    job_id, detail
                )));
            }
            JobState::Quarantined => {
                return Err(GuardianError::ContentPolicy(format!(
                    "job {} reported state Quarantined",
                    job_id
                )));
            }
            ref state => {
                if started.elapsed() + policy.interval >= policy.max_duration {
                    return Err(GuardianError::IndexingTimeout {
                        job_id: job_id.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
                info!(
                    "Status {} ... waiting {}s",
                    state,
                    policy.interval.as_secs()
                );
                sleep(policy.interval).await;
            }
        }
    }
}

/// Failure detail reported for the first video in a failed job, if any.
fn failure_message(payload: &Value) -> Option<String> {
    payload
        .get("videos")?
        .as_array()?
        .iter()
        .find_map(|v| v.get("failureMessage").and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn scripted(states: &[&str]) -> Mutex<VecDeque<Value>> {
        Mutex::new(
            states
                .iter()
                .map(|s| json!({ "state": s, "id": "job-1" }))
                .collect(),
        )
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::new(Duration::ZERO, Duration::from_secs(60))
    }

    async fn run(states: &[&str], policy: PollPolicy) -> (Result<Value>, usize) {
        let script = scripted(states);
        let counter = Mutex::new(0usize);
        let (polls, queue) = (&counter, &script);
        let result = poll_until_terminal("job-1", &policy, move || async move {
            *polls.lock().unwrap() += 1;
            let next = queue.lock().unwrap().pop_front();
            next.map(JobStatus::from_payload)
                .ok_or_else(|| GuardianError::Indexing("script exhausted".into()))
        })
        .await;
        let count = *counter.lock().unwrap();
        (result, count)
    }

    #[test]
    fn test_job_state_parsing() {
        assert_eq!(JobState::parse("Processed"), JobState::Processed);
        assert_eq!(JobState::parse("Quarantined"), JobState::Quarantined);
        assert_eq!(JobState::parse("Indexing"), JobState::Other("Indexing".into()));
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Uploaded.is_terminal());
        assert!(!JobState::parse("").is_terminal());
    }

    #[tokio::test]
    async fn test_polls_until_processed() {
        let (result, polls) = run(&["Uploaded", "Processing", "Processed"], fast_policy()).await;
        assert_eq!(result.unwrap()["state"], "Processed");
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_failed_is_indexing_error() {
        let (result, polls) = run(&["Processing", "Failed", "Processed"], fast_policy()).await;
        assert!(matches!(result, Err(GuardianError::Indexing(_))));
        assert_eq!(polls, 2);
    }

    #[tokio::test]
    async fn test_quarantined_is_content_policy_error() {
        let (result, _) = run(&["Quarantined"], fast_policy()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, GuardianError::ContentPolicy(_)));
        assert!(err.to_string().contains("Quarantined"));
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let policy = PollPolicy::new(Duration::from_millis(10), Duration::from_millis(25));
        let (result, polls) = run(&["Processing"; 10], policy).await;
        assert!(matches!(result, Err(GuardianError::IndexingTimeout { .. })));
        assert!(polls < 10);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (result, polls) = run(&[], fast_policy()).await;
        assert!(matches!(result, Err(GuardianError::Indexing(_))));
        assert_eq!(polls, 1);
    }

    #[test]
    fn test_failure_message() {
        let payload = json!({ "state": "Failed", "videos": [{ "failureMessage": "Unsupported codec" }] });
        assert_eq!(failure_message(&payload).as_deref(), Some("Unsupported codec"));
        assert_eq!(failure_message(&json!({})), None);
    }
}
