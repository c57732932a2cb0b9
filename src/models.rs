//! Data models and structures
//!
//! Defines task handles and statuses, generated artifacts, the uniform
//! `ServiceResult` boundary type, generation parameters and configuration.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lifecycle state of an upstream task as reported by `output.task_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Anything outside the four recognised values, kept verbatim.
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            other => TaskStatus::Unknown(other.to_string()),
        }
    }

    /// Reads `output.task_status` from a task body. A missing field is unknown.
    pub fn from_task_body(body: &serde_json::Value) -> Self {
        match body.pointer("/output/task_status").and_then(|v| v.as_str()) {
            Some(raw) => Self::parse(raw),
            None => TaskStatus::Unknown("<missing>".to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Running => write!(f, "RUNNING"),
            TaskStatus::Succeeded => write!(f, "SUCCEEDED"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// An acknowledged asynchronous submission. Moved into the poller, which
/// owns it until a terminal result is reached.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub task_id: String,
    pub created_at: DateTime<Utc>,
}

impl TaskHandle {
    pub fn new(task_id: String) -> Self {
        Self {
            task_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    pub id: u64,
    pub url: String,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Uniform outcome returned across the library boundary.
///
/// Serializes as `{"success":true,"data":..}` or `{"success":false,"error":".."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResult<T> {
    Success { data: T },
    Failure { error: String },
}

impl<T> ServiceResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ServiceResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ServiceResult::Success { data } => Some(data),
            ServiceResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ServiceResult::Success { .. } => None,
            ServiceResult::Failure { error } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ServiceResult::Success { data } => Some(data),
            ServiceResult::Failure { .. } => None,
        }
    }
}

impl<T> From<crate::Result<T>> for ServiceResult<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => ServiceResult::Success { data },
            Err(e) => ServiceResult::Failure {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct ServiceResultRef<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct ServiceResultOwned<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> Serialize for ServiceResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ServiceResultRef {
            success: self.is_success(),
            data: self.data(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ServiceResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = ServiceResultOwned::<T>::deserialize(deserializer)?;
        match (wire.success, wire.data) {
            (true, Some(data)) => Ok(ServiceResult::Success { data }),
            (true, None) => Err(serde::de::Error::missing_field("data")),
            (false, _) => Ok(ServiceResult::Failure {
                error: wire.error.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToImageParams {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageToImageParams {
    pub model: String,
    pub prompt: Option<String>,
    /// Public URL or `data:` URL of the reference image.
    pub image_url: String,
    pub count: u32,
    pub style_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToVideoParams {
    pub model: String,
    pub prompt: String,
    /// Output size such as `1280*720`.
    pub resolution: String,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageToVideoParams {
    pub model: String,
    pub prompt: String,
    pub image_url: String,
    /// Resolution tier such as `480P` or `720P`.
    pub resolution: String,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoToVideoParams {
    pub model: String,
    pub video_url: String,
    pub style: i32,
    pub video_fps: u32,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Checked per request, not at startup.
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll_max_attempts: u32,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            api_key: lookup("DASHSCOPE_API_KEY").filter(|key| !key.trim().is_empty()),
            base_url: lookup("DASHSCOPE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            poll_max_attempts: parse_var(&lookup, "POLL_MAX_ATTEMPTS")?
                .unwrap_or(defaults.poll_max_attempts),
            poll_interval: parse_var(&lookup, "POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            request_timeout: parse_var(&lookup, "REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> crate::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                crate::Error::Configuration(format!("{} has an invalid value: {}", key, raw))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_task_status_parsing() {
        assert_eq!(TaskStatus::parse("PENDING"), TaskStatus::Pending);
        assert_eq!(TaskStatus::parse("SUCCEEDED"), TaskStatus::Succeeded);
        assert_eq!(
            TaskStatus::parse("CANCELED"),
            TaskStatus::Unknown("CANCELED".to_string())
        );
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Unknown("x".to_string()).is_terminal());
    }

    #[test]
    fn test_task_status_missing_field_is_unknown() {
        let status = TaskStatus::from_task_body(&json!({ "output": {} }));
        assert!(matches!(status, TaskStatus::Unknown(_)));
    }

    #[test]
    fn test_service_result_wire_format() {
        let ok: ServiceResult<Vec<u32>> = ServiceResult::Success { data: vec![1] };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "success": true, "data": [1] })
        );

        let failed: ServiceResult<Vec<u32>> = ServiceResult::Failure {
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "success": false, "error": "boom" })
        );

        let parsed: ServiceResult<Vec<u32>> =
            serde_json::from_value(json!({ "success": false, "error": "nope" })).unwrap();
        assert_eq!(parsed.error(), Some("nope"));
    }

    #[test]
    fn test_service_result_from_error() {
        let result: ServiceResult<()> =
            Err(crate::Error::TaskFailed("quota exceeded".to_string())).into();
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("quota exceeded"));
    }

    #[test]
    fn test_config_defaults_without_key() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll_max_attempts, 60);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
    }

    #[test]
    fn test_config_reads_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DASHSCOPE_API_KEY", "sk-test"),
            ("DASHSCOPE_BASE_URL", "http://localhost:9000/"),
            ("POLL_MAX_ATTEMPTS", "5"),
            ("POLL_INTERVAL_MS", "10"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.poll_max_attempts, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_config_rejects_bad_number() {
        let err = Config::from_lookup(|key| {
            (key == "POLL_MAX_ATTEMPTS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }
}
