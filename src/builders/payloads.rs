//! Typed DashScope request bodies, one input/parameters pair per model family.

use serde::Serialize;

/// Common `{model, input, parameters}` envelope.
#[derive(Debug, Serialize)]
pub struct Payload<'a, I, P> {
    pub model: &'a str,
    pub input: I,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<P>,
}

#[derive(Debug, Serialize)]
pub struct ChatInput<'a> {
    pub messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TextPart<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct QwenImageParameters<'a> {
    pub negative_prompt: &'a str,
    pub prompt_extend: bool,
    pub watermark: bool,
    pub size: &'a str,
    pub n: u32,
}

#[derive(Debug, Serialize)]
pub struct PromptInput<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SizeParameters<'a> {
    pub size: &'a str,
    pub n: u32,
}

#[derive(Debug, Serialize)]
pub struct ImageEditInput<'a> {
    pub function: &'a str,
    pub prompt: &'a str,
    pub base_image_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CountParameters {
    pub n: u32,
}

#[derive(Debug, Serialize)]
pub struct StyleRepaintInput<'a> {
    pub image_url: &'a str,
    pub style_index: i32,
}

/// Placeholder for families that send no `parameters` object.
#[derive(Debug, Serialize)]
pub struct NoParameters {}

#[derive(Debug, Serialize)]
pub struct TextToVideoParameters<'a> {
    pub size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ImageToVideoInput<'a> {
    pub prompt: &'a str,
    pub img_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ImageToVideoParameters<'a> {
    pub resolution: &'a str,
    pub duration: u32,
}

#[derive(Debug, Serialize)]
pub struct VideoInput<'a> {
    pub video_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct VideoStyleParameters {
    pub style: i32,
    pub video_fps: u32,
}
