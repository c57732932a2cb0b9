//! Local file handling for generation inputs and outputs
//!
//! Saves generated artifacts into an output directory and inlines local
//! reference images as `data:` URLs, which DashScope accepts in place of a
//! public URL.

pub mod mime;

use crate::models::GeneratedArtifact;
use crate::Result;
use base64::Engine as _;
use chrono::Local;
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

pub struct Downloader {
    client: Client,
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        Self::new_with_client(output_dir, Client::new())
    }

    pub fn new_with_client(output_dir: PathBuf, client: Client) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;
        Ok(Self { client, output_dir })
    }

    /// A fresh `<root>/<date>_<uuid>` directory for one run.
    pub fn for_session(root: &Path) -> Result<Self> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let output_dir = root.join(format!("{}_{}", date, Uuid::new_v4()));
        let downloader = Self::new(output_dir)?;
        info!("Created output directory: {}", downloader.output_dir.display());
        Ok(downloader)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download one artifact to `<prefix>-<id>.<ext>`.
    pub async fn save(&self, artifact: &GeneratedArtifact, prefix: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(&artifact.url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let ext = mime::detect_extension(&bytes)
            .map(str::to_string)
            .or_else(|| mime::extension_from_url(&artifact.url))
            .unwrap_or_else(|| "bin".to_string());

        let path = self
            .output_dir
            .join(format!("{}-{}.{}", prefix, artifact.id, ext));
        fs::write(&path, &bytes)?;
        info!(
            "Saved {} ({} bytes) to {}",
            artifact.url,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    /// Download every artifact, skipping (and logging) the ones that fail.
    pub async fn save_all(&self, artifacts: &[GeneratedArtifact], prefix: &str) -> Vec<PathBuf> {
        let mut saved = Vec::with_capacity(artifacts.len());
        for (index, artifact) in artifacts.iter().enumerate() {
            match self.save(artifact, prefix).await {
                Ok(path) => saved.push(path),
                Err(e) => error!(
                    "Failed to download artifact {}/{} ({}): {}",
                    index + 1,
                    artifacts.len(),
                    artifact.url,
                    e
                ),
            }
        }
        saved
    }
}

/// Read a local image and encode it as a `data:<mime>;base64,...` URL.
pub fn read_image_as_data_url(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mime = mime::image_mime_for(&bytes);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[tokio::test]
    async fn test_save_all_sniffs_extension_and_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_HEADER.to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let downloader = Downloader::new(dir.path().join("out")).unwrap();
        let artifacts = vec![
            GeneratedArtifact {
                id: 1,
                url: format!("{}/ok", server.uri()),
            },
            GeneratedArtifact {
                id: 2,
                url: format!("{}/gone.jpg", server.uri()),
            },
        ];

        let saved = downloader.save_all(&artifacts, "image").await;

        assert_eq!(saved, vec![dir.path().join("out").join("image-1.png")]);
        assert_eq!(fs::read(&saved[0]).unwrap(), PNG_HEADER.to_vec());
    }

    #[tokio::test]
    async fn test_save_falls_back_to_url_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"plain".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let downloader = Downloader::new(dir.path().to_path_buf()).unwrap();
        let artifact = GeneratedArtifact {
            id: 7,
            url: format!("{}/clip.mov?token=abc", server.uri()),
        };

        let path = downloader.save(&artifact, "video").await.unwrap();
        assert!(path.ends_with("video-7.mov"));
    }

    #[test]
    fn test_session_directory_is_created() {
        let dir = tempdir().unwrap();
        let downloader = Downloader::for_session(dir.path()).unwrap();
        assert!(downloader.output_dir().is_dir());
        assert!(downloader.output_dir().starts_with(dir.path()));
    }

    #[test]
    fn test_read_image_as_data_url() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("ref.png");
        fs::write(&file, PNG_HEADER).unwrap();

        let url = read_image_as_data_url(&file).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with("iVBORw0KGgo="));
    }
}
