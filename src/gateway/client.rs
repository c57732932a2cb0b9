use super::Gateway;
use crate::models::DEFAULT_BASE_URL;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const ASYNC_HEADER: &str = "X-DashScope-Async";

/// Shape of DashScope error bodies, e.g. `{"code":"InvalidApiKey","message":"..."}`.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    code: Option<String>,
    message: Option<String>,
}

pub struct DashScopeGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl DashScopeGateway {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new_with_client(api_key, client))
    }

    pub fn new_with_client(api_key: Option<String>, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("DASHSCOPE_API_KEY is not set".to_string()))
    }

    /// `{base}/api/v1/tasks/{task_id}` with the id encoded as a single segment.
    fn task_url(&self, task_id: &str) -> Result<Url> {
        if task_id.contains('/') || task_id == "." || task_id == ".." {
            return Err(Error::InvalidInput(format!("invalid task id: {}", task_id)));
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("invalid base url {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::Configuration(format!("base url cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "tasks", task_id]);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send request to DashScope: {}", e);
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("DashScope API error (status {}): {}", status, error_text);
            let (code, message) = match serde_json::from_str::<UpstreamErrorBody>(&error_text) {
                Ok(body) => (body.code, body.message),
                Err(_) => (None, None),
            };
            return Err(Error::Upstream {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse DashScope response: {}\nBody: {}", e, body);
            Error::Serialization(e)
        })
    }
}

#[async_trait]
impl Gateway for DashScopeGateway {
    async fn forward(&self, api_url: &str, payload: &Value, is_async: bool) -> Result<Value> {
        if api_url.trim().is_empty() {
            return Err(Error::InvalidInput("API url is required".to_string()));
        }
        let api_key = self.api_key()?;

        tracing::debug!(api_url, is_async, "Forwarding request to DashScope");

        let mut request = self
            .client
            .post(api_url)
            .bearer_auth(api_key)
            .json(payload);
        if is_async {
            request = request.header(ASYNC_HEADER, "enable");
        }

        self.send(request).await
    }

    async fn lookup(&self, task_id: &str) -> Result<Value> {
        if task_id.trim().is_empty() {
            return Err(Error::InvalidInput("task id is required".to_string()));
        }
        let api_key = self.api_key()?;

        let url = self.task_url(task_id)?;
        tracing::debug!(task_id, "Looking up DashScope task");

        self.send(self.client.get(url).bearer_auth(api_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> DashScopeGateway {
        DashScopeGateway::new(Some("sk-test".to_string()), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_forward_adds_credentials_and_async_header() {
        let server = MockServer::start().await;
        let payload = json!({ "model": "wanx2.1-t2v-turbo", "input": { "prompt": "waves" } });

        Mock::given(method("POST"))
            .and(path("/api/v1/services/aigc/video-generation/video-synthesis"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(header("X-DashScope-Async", "enable"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": { "task_id": "T1", "task_status": "PENDING" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!(
            "{}/api/v1/services/aigc/video-generation/video-synthesis",
            server.uri()
        );
        let body = gateway(&server).forward(&url, &payload, true).await.unwrap();
        assert_eq!(body["output"]["task_id"], "T1");
    }

    #[tokio::test]
    async fn test_forward_sync_omits_async_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header_exists("X-DashScope-Async"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": {} })))
            .mount(&server)
            .await;

        let body = gateway(&server)
            .forward(&server.uri(), &json!({}), false)
            .await
            .unwrap();
        assert_eq!(body, json!({ "output": {} }));
    }

    #[tokio::test]
    async fn test_forward_preserves_upstream_error_code() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "InvalidApiKey",
                "message": "Invalid API-key provided."
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .forward(&server.uri(), &json!({}), false)
            .await
            .unwrap_err();
        match err {
            Error::Upstream {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("InvalidApiKey"));
                assert_eq!(message.as_deref(), Some("Invalid API-key provided."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forward_non_json_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .forward(&server.uri(), &json!({}), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream {
                status: 502,
                code: None,
                message: None
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = DashScopeGateway::new(None, Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());

        let err = gateway
            .forward(&server.uri(), &json!({}), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = gateway.lookup("T1").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected() {
        let gateway = DashScopeGateway::new(Some("k".to_string()), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            gateway.forward("", &json!({}), false).await.unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            gateway.lookup(" ").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_lookup_gets_task_resource() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/T42"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": { "task_id": "T42", "task_status": "RUNNING" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let body = gateway(&server).lookup("T42").await.unwrap();
        assert_eq!(body["output"]["task_status"], "RUNNING");
    }

    #[tokio::test]
    async fn test_lookup_keeps_task_id_inside_tasks_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": {} })))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        for task_id in ["../services/x", "a/b", ".."] {
            assert!(matches!(
                gateway.lookup(task_id).await.unwrap_err(),
                Error::InvalidInput(_)
            ));
        }
        assert!(server.received_requests().await.unwrap().is_empty());

        gateway.lookup("a b?c").await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.path(), "/api/v1/tasks/a%20b%3Fc");
        assert_eq!(requests[0].url.query(), None);
    }
}
