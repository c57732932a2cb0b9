use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dashscope_studio::download::{read_image_as_data_url, Downloader};
use dashscope_studio::models::{
    Config, GeneratedArtifact, ImageToImageParams, ImageToVideoParams, ServiceResult,
    TextToImageParams, TextToVideoParams, VideoResult, VideoToVideoParams,
};
use dashscope_studio::studio::Studio;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dashscope-studio")]
#[command(about = "Generate images and videos with DashScope models")]
struct CliArgs {
    /// Download generated artifacts into a new session folder under this directory.
    #[arg(long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the raw service result as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Text to image (qwen-image, wan2.2-t2i-flash, wan2.2-t2i-plus).
    TextToImage {
        #[arg(long, default_value = "wan2.2-t2i-flash")]
        model: String,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "1024*1024")]
        size: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Edit or restyle a reference image.
    ImageToImage {
        #[arg(long, default_value = "wanx2.1-imageedit")]
        model: String,
        #[arg(long)]
        prompt: Option<String>,
        #[command(flatten)]
        image: ImageSource,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long)]
        style_index: Option<i32>,
    },
    /// Text to video.
    TextToVideo {
        #[arg(long, default_value = "wanx2.1-t2v-turbo")]
        model: String,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "1280*720")]
        resolution: String,
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Animate a reference image.
    ImageToVideo {
        #[arg(long, default_value = "wan2.2-i2v-flash")]
        model: String,
        #[arg(long)]
        prompt: String,
        #[command(flatten)]
        image: ImageSource,
        #[arg(long, default_value = "720P")]
        resolution: String,
        #[arg(long, default_value_t = 5)]
        duration: u32,
    },
    /// Restyle an uploaded video.
    VideoToVideo {
        #[arg(long, default_value = "video-style-transform")]
        model: String,
        #[arg(long)]
        video_url: String,
        #[arg(long, default_value_t = 0)]
        style: i32,
        #[arg(long, default_value_t = 15)]
        fps: u32,
    },
    /// Look up a task once by id.
    Task {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct ImageSource {
    /// Public URL of the reference image.
    #[arg(long)]
    image_url: Option<String>,
    /// Local image file, sent inline as a data URL.
    #[arg(long)]
    image_file: Option<PathBuf>,
}

impl ImageSource {
    fn resolve(&self) -> Result<String> {
        match (&self.image_url, &self.image_file) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(path)) => read_image_as_data_url(path)
                .with_context(|| format!("Failed to read image {}", path.display())),
            (None, None) => anyhow::bail!("either --image-url or --image-file is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashscope_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Failed to run: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the requested operation succeeded.
async fn run(args: CliArgs) -> Result<bool> {
    let config = Config::from_env()?;
    let studio = Studio::from_config(&config)?;

    match args.command {
        Command::TextToImage {
            model,
            prompt,
            size,
            count,
        } => {
            let result = studio
                .generate_image(TextToImageParams {
                    model,
                    prompt,
                    size,
                    count,
                })
                .await;
            finish_images(result, &args.output_dir, args.json, "image").await
        }
        Command::ImageToImage {
            model,
            prompt,
            image,
            count,
            style_index,
        } => {
            let result = studio
                .image_to_image(ImageToImageParams {
                    model,
                    prompt,
                    image_url: image.resolve()?,
                    count,
                    style_index,
                })
                .await;
            finish_images(result, &args.output_dir, args.json, "image").await
        }
        Command::TextToVideo {
            model,
            prompt,
            resolution,
            duration,
        } => {
            let result = studio
                .text_to_video(TextToVideoParams {
                    model,
                    prompt,
                    resolution,
                    duration,
                })
                .await;
            finish_video(result, &args.output_dir, args.json).await
        }
        Command::ImageToVideo {
            model,
            prompt,
            image,
            resolution,
            duration,
        } => {
            let result = studio
                .image_to_video(ImageToVideoParams {
                    model,
                    prompt,
                    image_url: image.resolve()?,
                    resolution,
                    duration,
                })
                .await;
            finish_video(result, &args.output_dir, args.json).await
        }
        Command::VideoToVideo {
            model,
            video_url,
            style,
            fps,
        } => {
            let result = studio
                .video_to_video(VideoToVideoParams {
                    model,
                    video_url,
                    style,
                    video_fps: fps,
                })
                .await;
            finish_video(result, &args.output_dir, args.json).await
        }
        Command::Task { task_id } => {
            let result = studio.task_status(&task_id).await;
            print_result(&result, true, Vec::new())
        }
    }
}

async fn finish_images(
    result: ServiceResult<Vec<GeneratedArtifact>>,
    output_dir: &Option<PathBuf>,
    json: bool,
    prefix: &str,
) -> Result<bool> {
    let artifacts = result.data().cloned().unwrap_or_default();
    if result.is_success() && artifacts.is_empty() {
        info!("The model reported success but produced no results");
    }
    save(&artifacts, output_dir, prefix).await?;
    let urls = artifacts.into_iter().map(|a| a.url).collect();
    print_result(&result, json, urls)
}

async fn finish_video(
    result: ServiceResult<VideoResult>,
    output_dir: &Option<PathBuf>,
    json: bool,
) -> Result<bool> {
    let artifacts: Vec<GeneratedArtifact> = result
        .data()
        .map(|video| GeneratedArtifact {
            id: video.id,
            url: video.url.clone(),
        })
        .into_iter()
        .collect();
    save(&artifacts, output_dir, "video").await?;
    let urls = artifacts.into_iter().map(|a| a.url).collect();
    print_result(&result, json, urls)
}

async fn save(
    artifacts: &[GeneratedArtifact],
    output_dir: &Option<PathBuf>,
    prefix: &str,
) -> Result<()> {
    if let (Some(root), false) = (output_dir, artifacts.is_empty()) {
        let downloader = Downloader::for_session(root)?;
        let saved = downloader.save_all(artifacts, prefix).await;
        info!(
            "Saved {}/{} artifact(s) to {}",
            saved.len(),
            artifacts.len(),
            downloader.output_dir().display()
        );
    }
    Ok(())
}

fn print_result<T: Serialize>(
    result: &ServiceResult<T>,
    json: bool,
    urls: Vec<String>,
) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if let Some(message) = result.error() {
        eprintln!("Generation failed: {}", message);
    } else {
        for url in urls {
            println!("{}", url);
        }
    }
    Ok(result.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_text_to_image_defaults() {
        let args = CliArgs::try_parse_from([
            "dashscope-studio",
            "text-to-image",
            "--prompt",
            "a red bicycle",
        ])
        .unwrap();

        match args.command {
            Command::TextToImage {
                model, size, count, ..
            } => {
                assert_eq!(model, "wan2.2-t2i-flash");
                assert_eq!(size, "1024*1024");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_exactly_one_image_source() {
        assert!(CliArgs::try_parse_from([
            "dashscope-studio",
            "image-to-video",
            "--prompt",
            "zoom",
        ])
        .is_err());

        assert!(CliArgs::try_parse_from([
            "dashscope-studio",
            "image-to-video",
            "--prompt",
            "zoom",
            "--image-url",
            "https://img/a.png",
            "--image-file",
            "a.png",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "dashscope-studio",
            "task",
            "T1",
            "--json",
            "--output-dir",
            "out",
        ])
        .unwrap();
        assert!(args.json);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }
}
