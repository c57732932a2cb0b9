//! Result extractors
//!
//! Maps the terminal upstream body of each model family into a uniform list of
//! artifacts. Missing fields produce an empty list, never an error.

use crate::builders::{Model, ModelFamily};
use crate::models::GeneratedArtifact;
use crate::{Error, Result};
use serde_json::Value;

/// Extract generated artifact URLs from a terminal response body.
///
/// Ids are assigned sequentially from 1 in upstream order, so the same
/// `(model, body)` pair always yields the same list.
pub fn extract_artifacts(model: Model, body: &Value) -> Vec<GeneratedArtifact> {
    let urls: Vec<&str> = match model.family() {
        ModelFamily::QwenImage => array_at(body, "/output/choices")
            .filter_map(|choice| choice.pointer("/message/content/0/image"))
            .filter_map(Value::as_str)
            .collect(),
        ModelFamily::WanTextToImage | ModelFamily::ImageEdit | ModelFamily::StyleRepaint => {
            array_at(body, "/output/results")
                .filter_map(|result| result.get("url"))
                .filter_map(Value::as_str)
                .collect()
        }
        ModelFamily::TextToVideo | ModelFamily::ImageToVideo => {
            str_at(body, "/output/video_url").into_iter().collect()
        }
        ModelFamily::VideoStyleTransform => {
            str_at(body, "/output/output_video_url").into_iter().collect()
        }
    };

    urls.into_iter()
        .filter(|url| !url.is_empty())
        .zip(1u64..)
        .map(|(url, id)| GeneratedArtifact {
            id,
            url: url.to_string(),
        })
        .collect()
}

/// Task id from a task-creation response (`output.task_id`).
pub fn extract_task_id(body: &Value) -> Result<String> {
    str_at(body, "/output/task_id")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingTaskId)
}

/// Human readable failure reason of a `FAILED` task body.
pub fn extract_failure_message(body: &Value) -> Option<String> {
    ["/task_metrics/error_message", "/output/message", "/output/code"]
        .iter()
        .find_map(|pointer| str_at(body, pointer).filter(|message| !message.is_empty()))
        .map(str::to_string)
}

fn array_at<'a>(body: &'a Value, pointer: &str) -> impl Iterator<Item = &'a Value> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn str_at<'a>(body: &'a Value, pointer: &str) -> Option<&'a str> {
    body.pointer(pointer).and_then(Value::as_str)
}
