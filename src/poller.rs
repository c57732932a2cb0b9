//! Task poller
//!
//! Drives a [`TaskHandle`] to a terminal status with a fixed number of status
//! lookups spaced by a fixed interval. The timeout is attempt based: the
//! total sleep is `(max_attempts - 1) * interval` plus round-trip latency.
//!
//! Callers must not poll the same task id twice concurrently; nothing here
//! checks for it.

use crate::extractors::extract_failure_message;
use crate::gateway::Gateway;
use crate::models::{
    TaskHandle, TaskStatus, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_MAX_ATTEMPTS,
};
use crate::{Error, Result};
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{info, warn};

const GENERIC_FAILURE: &str = "task execution failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidInput(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Why a single attempt did not produce a terminal success.
#[derive(Debug)]
enum AttemptError {
    /// The task is still pending or running.
    NotReady(TaskStatus),
    /// The lookup itself failed in a way worth repeating.
    Transient(Error),
    /// A terminal failure; stop immediately.
    Terminal(Error),
}

impl AttemptError {
    fn should_retry(&self) -> bool {
        matches!(self, AttemptError::NotReady(_) | AttemptError::Transient(_))
    }
}

pub struct TaskPoller<'a> {
    gateway: &'a dyn Gateway,
    policy: PollPolicy,
}

impl<'a> TaskPoller<'a> {
    pub fn new(gateway: &'a dyn Gateway, policy: PollPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Poll until the task succeeds, fails, reports an unknown status, or the
    /// attempt budget runs out. Returns the full upstream body on success.
    pub async fn poll_until_terminal(&self, handle: TaskHandle) -> Result<Value> {
        let attempts = AtomicU32::new(0);
        // One lookup up front, then one per retry.
        let strategy = FixedInterval::new(self.policy.interval)
            .take(self.policy.max_attempts.saturating_sub(1) as usize);

        let outcome = RetryIf::spawn(
            strategy,
            || self.attempt(&handle.task_id, &attempts),
            |e: &AttemptError| e.should_retry(),
        )
        .await;

        let elapsed = Utc::now() - handle.created_at;
        let used = attempts.load(Ordering::SeqCst);
        match outcome {
            Ok(body) => {
                info!(
                    task_id = %handle.task_id,
                    attempts = used,
                    elapsed_ms = elapsed.num_milliseconds(),
                    "Task succeeded"
                );
                Ok(body)
            }
            Err(AttemptError::NotReady(status)) => {
                warn!(
                    task_id = %handle.task_id,
                    attempts = used,
                    "Task still {} after attempt budget",
                    status
                );
                Err(Error::Timeout { attempts: used })
            }
            Err(AttemptError::Transient(e)) | Err(AttemptError::Terminal(e)) => {
                warn!(task_id = %handle.task_id, attempts = used, "Task polling ended: {}", e);
                Err(e)
            }
        }
    }

    async fn attempt(
        &self,
        task_id: &str,
        attempts: &AtomicU32,
    ) -> std::result::Result<Value, AttemptError> {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let body = match self.gateway.lookup(task_id).await {
            Ok(body) => body,
            Err(e) if e.is_transient() => {
                warn!(
                    "Task status lookup failed (attempt {}/{}): {}",
                    attempt, self.policy.max_attempts, e
                );
                return Err(AttemptError::Transient(e));
            }
            Err(e) => return Err(AttemptError::Terminal(e)),
        };

        if !body.get("output").is_some_and(Value::is_object) {
            let reason = ["/code", "/message"]
                .iter()
                .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
                .unwrap_or("no output object")
                .to_string();
            warn!(
                "Task status body without output (attempt {}/{}): {}",
                attempt, self.policy.max_attempts, reason
            );
            return Err(AttemptError::Transient(Error::MissingOutput(reason)));
        }

        let status = TaskStatus::from_task_body(&body);
        tracing::debug!(
            "Task {} status {} (attempt {}/{})",
            task_id,
            status,
            attempt,
            self.policy.max_attempts
        );

        match status {
            TaskStatus::Succeeded => Ok(body),
            TaskStatus::Failed => Err(AttemptError::Terminal(Error::TaskFailed(
                extract_failure_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ))),
            TaskStatus::Pending | TaskStatus::Running => Err(AttemptError::NotReady(status)),
            TaskStatus::Unknown(raw) => Err(AttemptError::Terminal(Error::UnknownStatus(raw))),
        }
    }
}
