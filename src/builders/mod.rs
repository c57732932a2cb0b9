//! Request builders
//!
//! Maps a model name and user-supplied fields to the exact JSON body the
//! model's family expects. Builders are pure: no network and no state.

pub mod payloads;

use crate::models::{
    ImageToImageParams, ImageToVideoParams, TextToImageParams, TextToVideoParams,
    VideoToVideoParams,
};
use crate::{Error, Result};
use payloads::*;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const MAX_PROMPT_CHARS: usize = 2000;
pub const MIN_OUTPUT_COUNT: u32 = 1;
pub const MAX_OUTPUT_COUNT: u32 = 4;

const MULTIMODAL_GENERATION_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";
const TEXT_TO_IMAGE_PATH: &str = "/api/v1/services/aigc/text2image/image-synthesis";
const IMAGE_TO_IMAGE_PATH: &str = "/api/v1/services/aigc/image2image/image-synthesis";
const IMAGE_GENERATION_PATH: &str = "/api/v1/services/aigc/image-generation/generation";
const VIDEO_SYNTHESIS_PATH: &str = "/api/v1/services/aigc/video-generation/video-synthesis";

/// Every model id the studio knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    QwenImage,
    Wan22T2iFlash,
    Wan22T2iPlus,
    Wanx21ImageEdit,
    WanxStyleRepaintV1,
    Wanx21T2vTurbo,
    Wanx21T2vPlus,
    Wan22T2vPlus,
    Wanx21I2vTurbo,
    Wanx21I2vPlus,
    Wan22I2vFlash,
    Wan22I2vPlus,
    VideoStyleTransform,
}

/// Models sharing one request and response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Chat-style multimodal payload, synchronous.
    QwenImage,
    /// Flat prompt/size payload, synchronous.
    WanTextToImage,
    /// Instruction edit of a base image.
    ImageEdit,
    /// Fixed-style repaint of a portrait image.
    StyleRepaint,
    TextToVideo,
    ImageToVideo,
    VideoStyleTransform,
}

impl Model {
    pub const ALL: [Model; 13] = [
        Model::QwenImage,
        Model::Wan22T2iFlash,
        Model::Wan22T2iPlus,
        Model::Wanx21ImageEdit,
        Model::WanxStyleRepaintV1,
        Model::Wanx21T2vTurbo,
        Model::Wanx21T2vPlus,
        Model::Wan22T2vPlus,
        Model::Wanx21I2vTurbo,
        Model::Wanx21I2vPlus,
        Model::Wan22I2vFlash,
        Model::Wan22I2vPlus,
        Model::VideoStyleTransform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::QwenImage => "qwen-image",
            Model::Wan22T2iFlash => "wan2.2-t2i-flash",
            Model::Wan22T2iPlus => "wan2.2-t2i-plus",
            Model::Wanx21ImageEdit => "wanx2.1-imageedit",
            Model::WanxStyleRepaintV1 => "wanx-style-repaint-v1",
            Model::Wanx21T2vTurbo => "wanx2.1-t2v-turbo",
            Model::Wanx21T2vPlus => "wanx2.1-t2v-plus",
            Model::Wan22T2vPlus => "wan2.2-t2v-plus",
            Model::Wanx21I2vTurbo => "wanx2.1-i2v-turbo",
            Model::Wanx21I2vPlus => "wanx2.1-i2v-plus",
            Model::Wan22I2vFlash => "wan2.2-i2v-flash",
            Model::Wan22I2vPlus => "wan2.2-i2v-plus",
            Model::VideoStyleTransform => "video-style-transform",
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Model::QwenImage => ModelFamily::QwenImage,
            Model::Wan22T2iFlash | Model::Wan22T2iPlus => ModelFamily::WanTextToImage,
            Model::Wanx21ImageEdit => ModelFamily::ImageEdit,
            Model::WanxStyleRepaintV1 => ModelFamily::StyleRepaint,
            Model::Wanx21T2vTurbo | Model::Wanx21T2vPlus | Model::Wan22T2vPlus => {
                ModelFamily::TextToVideo
            }
            Model::Wanx21I2vTurbo
            | Model::Wanx21I2vPlus
            | Model::Wan22I2vFlash
            | Model::Wan22I2vPlus => ModelFamily::ImageToVideo,
            Model::VideoStyleTransform => ModelFamily::VideoStyleTransform,
        }
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Model::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| Error::UnsupportedModel(s.to_string()))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ModelFamily {
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ModelFamily::QwenImage => MULTIMODAL_GENERATION_PATH,
            ModelFamily::WanTextToImage => TEXT_TO_IMAGE_PATH,
            ModelFamily::ImageEdit => IMAGE_TO_IMAGE_PATH,
            ModelFamily::StyleRepaint => IMAGE_GENERATION_PATH,
            ModelFamily::TextToVideo
            | ModelFamily::ImageToVideo
            | ModelFamily::VideoStyleTransform => VIDEO_SYNTHESIS_PATH,
        }
    }

    /// Whether submissions return a task id to be polled.
    pub fn is_async(&self) -> bool {
        match self {
            ModelFamily::QwenImage | ModelFamily::WanTextToImage => false,
            ModelFamily::ImageEdit
            | ModelFamily::StyleRepaint
            | ModelFamily::TextToVideo
            | ModelFamily::ImageToVideo
            | ModelFamily::VideoStyleTransform => true,
        }
    }
}

/// A fully shaped outbound call. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    model: Model,
    api_url: String,
    payload: Value,
    is_async: bool,
}

impl GenerationRequest {
    fn new<T: Serialize>(base_url: &str, model: Model, payload: &T) -> Result<Self> {
        let family = model.family();
        Ok(Self {
            model,
            api_url: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                family.endpoint_path()
            ),
            payload: serde_json::to_value(payload)?,
            is_async: family.is_async(),
        })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

fn model_for(name: &str, accepted: &[ModelFamily], flow: &str) -> Result<Model> {
    let model: Model = name.parse()?;
    if accepted.contains(&model.family()) {
        Ok(model)
    } else {
        Err(wrong_flow(model, flow))
    }
}

fn wrong_flow(model: Model, flow: &str) -> Error {
    Error::UnsupportedModel(format!("{} does not support {}", model, flow))
}

fn checked_prompt(prompt: &str) -> Result<&str> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(Error::InvalidInput("prompt is required".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(Error::InvalidInput(format!(
            "prompt must be at most {} characters",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(prompt)
}

fn checked_count(count: u32) -> Result<u32> {
    if (MIN_OUTPUT_COUNT..=MAX_OUTPUT_COUNT).contains(&count) {
        Ok(count)
    } else {
        Err(Error::InvalidInput(format!(
            "output count must be between {} and {}",
            MIN_OUTPUT_COUNT, MAX_OUTPUT_COUNT
        )))
    }
}

fn checked_non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::InvalidInput(format!("{} is required", what)))
    } else {
        Ok(value)
    }
}

pub fn text_to_image(base_url: &str, params: &TextToImageParams) -> Result<GenerationRequest> {
    let model = model_for(
        &params.model,
        &[ModelFamily::QwenImage, ModelFamily::WanTextToImage],
        "text-to-image",
    )?;
    let prompt = checked_prompt(&params.prompt)?;
    let size = checked_non_empty(&params.size, "size")?;
    let n = checked_count(params.count)?;

    match model.family() {
        ModelFamily::QwenImage => GenerationRequest::new(
            base_url,
            model,
            &Payload {
                model: model.as_str(),
                input: ChatInput {
                    messages: vec![ChatMessage {
                        role: "user",
                        content: vec![TextPart { text: prompt }],
                    }],
                },
                parameters: Some(QwenImageParameters {
                    negative_prompt: "",
                    prompt_extend: true,
                    watermark: false,
                    size,
                    n,
                }),
            },
        ),
        ModelFamily::WanTextToImage => GenerationRequest::new(
            base_url,
            model,
            &Payload {
                model: model.as_str(),
                input: PromptInput { prompt },
                parameters: Some(SizeParameters { size, n }),
            },
        ),
        _ => Err(wrong_flow(model, "text-to-image")),
    }
}

pub fn image_to_image(base_url: &str, params: &ImageToImageParams) -> Result<GenerationRequest> {
    let model = model_for(
        &params.model,
        &[ModelFamily::ImageEdit, ModelFamily::StyleRepaint],
        "image-to-image",
    )?;
    let image_url = checked_non_empty(&params.image_url, "reference image url")?;

    match model.family() {
        ModelFamily::ImageEdit => {
            let prompt = checked_prompt(params.prompt.as_deref().unwrap_or_default())?;
            GenerationRequest::new(
                base_url,
                model,
                &Payload {
                    model: model.as_str(),
                    input: ImageEditInput {
                        function: "stylization_all",
                        prompt,
                        base_image_url: image_url,
                    },
                    parameters: Some(CountParameters {
                        n: checked_count(params.count)?,
                    }),
                },
            )
        }
        ModelFamily::StyleRepaint => GenerationRequest::new(
            base_url,
            model,
            &Payload::<_, NoParameters> {
                model: model.as_str(),
                input: StyleRepaintInput {
                    image_url,
                    style_index: params.style_index.unwrap_or(0),
                },
                parameters: None,
            },
        ),
        _ => Err(wrong_flow(model, "image-to-image")),
    }
}

pub fn text_to_video(base_url: &str, params: &TextToVideoParams) -> Result<GenerationRequest> {
    let model = model_for(&params.model, &[ModelFamily::TextToVideo], "text-to-video")?;
    let prompt = checked_prompt(&params.prompt)?;
    let size = checked_non_empty(&params.resolution, "resolution")?;

    GenerationRequest::new(
        base_url,
        model,
        &Payload {
            model: model.as_str(),
            input: PromptInput { prompt },
            parameters: Some(TextToVideoParameters {
                size,
                duration: params.duration,
            }),
        },
    )
}

pub fn image_to_video(base_url: &str, params: &ImageToVideoParams) -> Result<GenerationRequest> {
    let model = model_for(&params.model, &[ModelFamily::ImageToVideo], "image-to-video")?;
    let prompt = checked_prompt(&params.prompt)?;
    let img_url = checked_non_empty(&params.image_url, "reference image url")?;
    let resolution = checked_non_empty(&params.resolution, "resolution")?;

    GenerationRequest::new(
        base_url,
        model,
        &Payload {
            model: model.as_str(),
            input: ImageToVideoInput { prompt, img_url },
            parameters: Some(ImageToVideoParameters {
                resolution,
                duration: params.duration,
            }),
        },
    )
}

pub fn video_to_video(base_url: &str, params: &VideoToVideoParams) -> Result<GenerationRequest> {
    let model = model_for(
        &params.model,
        &[ModelFamily::VideoStyleTransform],
        "video-to-video",
    )?;
    let video_url = checked_non_empty(&params.video_url, "source video url")?;
    if params.video_fps == 0 {
        return Err(Error::InvalidInput("video fps must be positive".to_string()));
    }

    GenerationRequest::new(
        base_url,
        model,
        &Payload {
            model: model.as_str(),
            input: VideoInput { video_url },
            parameters: Some(VideoStyleParameters {
                style: params.style,
                video_fps: params.video_fps,
            }),
        },
    )
}
