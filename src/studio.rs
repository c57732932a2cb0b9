//! Generation orchestration exposed to callers.
//!
//! Each generation type is one async call returning a [`ServiceResult`]:
//! build the request, forward it, poll asynchronous tasks, then extract
//! artifacts. Failures never escape as `Err`.

use crate::builders::{self, GenerationRequest};
use crate::extractors::{extract_artifacts, extract_task_id};
use crate::gateway::{DashScopeGateway, Gateway};
use crate::models::{
    Config, GeneratedArtifact, ImageToImageParams, ImageToVideoParams, ServiceResult, TaskHandle,
    TextToImageParams, TextToVideoParams, VideoResult, VideoToVideoParams, DEFAULT_BASE_URL,
};
use crate::poller::{PollPolicy, TaskPoller};
use crate::{Error, Result};
use serde_json::Value;
use tracing::{error, info, warn};

pub struct Studio {
    gateway: Box<dyn Gateway>,
    base_url: String,
    poll: PollPolicy,
}

/// Injectable service bundle used to construct [`Studio`] in tests/harnesses.
pub struct StudioServices {
    pub gateway: Box<dyn Gateway>,
}

#[derive(Debug, Clone)]
pub struct StudioSettings {
    /// Base URL used to build model endpoint URLs.
    pub base_url: String,
    pub poll: PollPolicy,
}

impl StudioSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            poll: PollPolicy::new(config.poll_max_attempts, config.poll_interval)?,
        })
    }
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl Studio {
    /// Build a studio from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: StudioServices, settings: StudioSettings) -> Self {
        Self {
            gateway: services.gateway,
            base_url: settings.base_url,
            poll: settings.poll,
        }
    }

    /// Construct a studio talking to DashScope as configured.
    ///
    /// A missing API key is not an error here; each request reports it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = StudioSettings::from_config(config)?;
        let gateway = DashScopeGateway::new(config.api_key.clone(), config.request_timeout)?
            .with_base_url(config.base_url.clone());

        info!(
            "DashScope base url: {} (poll {} x {:?})",
            settings.base_url,
            settings.poll.max_attempts(),
            settings.poll.interval()
        );

        Ok(Self::with_services(
            StudioServices {
                gateway: Box::new(gateway),
            },
            settings,
        ))
    }

    pub async fn generate_image(
        &self,
        params: TextToImageParams,
    ) -> ServiceResult<Vec<GeneratedArtifact>> {
        self.run_images(builders::text_to_image(&self.base_url, &params))
            .await
            .into()
    }

    pub async fn image_to_image(
        &self,
        params: ImageToImageParams,
    ) -> ServiceResult<Vec<GeneratedArtifact>> {
        self.run_images(builders::image_to_image(&self.base_url, &params))
            .await
            .into()
    }

    pub async fn text_to_video(&self, params: TextToVideoParams) -> ServiceResult<VideoResult> {
        self.run_video(builders::text_to_video(&self.base_url, &params))
            .await
            .into()
    }

    pub async fn image_to_video(&self, params: ImageToVideoParams) -> ServiceResult<VideoResult> {
        self.run_video(builders::image_to_video(&self.base_url, &params))
            .await
            .into()
    }

    pub async fn video_to_video(&self, params: VideoToVideoParams) -> ServiceResult<VideoResult> {
        self.run_video(builders::video_to_video(&self.base_url, &params))
            .await
            .into()
    }

    /// Single status lookup for a task id, without polling.
    pub async fn task_status(&self, task_id: &str) -> ServiceResult<Value> {
        self.gateway.lookup(task_id).await.into()
    }

    async fn run_images(
        &self,
        request: Result<GenerationRequest>,
    ) -> Result<Vec<GeneratedArtifact>> {
        let request = request?;
        let (body, _) = self.execute(&request).await?;
        let artifacts = extract_artifacts(request.model(), &body);

        if artifacts.is_empty() {
            warn!("[{}] Generation succeeded with no results", request.model());
        } else {
            info!(
                "[{}] Generated {} artifact(s)",
                request.model(),
                artifacts.len()
            );
        }
        Ok(artifacts)
    }

    async fn run_video(&self, request: Result<GenerationRequest>) -> Result<VideoResult> {
        let request = request?;
        let (body, task_id) = self.execute(&request).await?;

        let artifact = extract_artifacts(request.model(), &body)
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::NoArtifacts(format!("{} returned no video url", request.model()))
            })?;

        info!("[{}] Generated video {}", request.model(), artifact.url);
        Ok(VideoResult {
            id: artifact.id,
            url: artifact.url,
            task_id,
        })
    }

    /// Forward the request; for asynchronous models, poll the created task to
    /// completion. Returns the terminal body and the task id, if any.
    async fn execute(&self, request: &GenerationRequest) -> Result<(Value, Option<String>)> {
        let model = request.model();
        info!(
            "[{}] Submitting {} request",
            model,
            if request.is_async() { "async" } else { "sync" }
        );

        let body = self
            .gateway
            .forward(request.api_url(), request.payload(), request.is_async())
            .await
            .map_err(|e| {
                error!("[{}] Submission failed: {}", model, e);
                e
            })?;

        if !request.is_async() {
            return Ok((body, None));
        }

        let task_id = extract_task_id(&body)?;
        info!("[{}] Task {} created, polling for result", model, task_id);

        let poller = TaskPoller::new(self.gateway.as_ref(), self.poll);
        let body = poller
            .poll_until_terminal(TaskHandle::new(task_id.clone()))
            .await
            .map_err(|e| {
                error!("[{}] Task {} did not succeed: {}", model, task_id, e);
                e
            })?;

        Ok((body, Some(task_id)))
    }
}
