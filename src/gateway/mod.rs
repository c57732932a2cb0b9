//! Credentialed access to the DashScope generation API
//!
//! The gateway adds the server-held API key to outbound calls and relays the
//! upstream JSON back verbatim. It never retries; retry policy belongs to the
//! task poller.

pub mod client;
pub mod mock;

pub use client::DashScopeGateway;
pub use mock::{MockGateway, MockReply};

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// POST `payload` to `api_url`, optionally requesting asynchronous
    /// processing, and return the upstream body.
    async fn forward(&self, api_url: &str, payload: &Value, is_async: bool) -> Result<Value>;

    /// GET the task resource for `task_id`.
    async fn lookup(&self, task_id: &str) -> Result<Value>;
}
