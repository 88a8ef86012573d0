//! Downloading post media so it can be re-uploaded as attachments.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::process::Command;

use crate::config::ImportConfig;
use crate::error::MediaError;
use crate::models::Attachment;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Attachment, MediaError>;

    /// Downloads the video embedded in the post at `post_url`.
    async fn fetch_video(&self, post_url: &str) -> Result<Attachment, MediaError>;
}

/// Requests the large JPEG rendition of a media URL.
pub fn normalize_image_url(url: &str) -> String {
    let base = url.split('?').next().unwrap_or(url);
    format!("{base}?format=jpg&name=large")
}

pub fn image_filename(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let name = if name.is_empty() { "image" } else { name };
    if IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        name.to_string()
    } else {
        format!("{name}.jpg")
    }
}

/// Stable per-post filename so repeated runs upload the same name.
pub fn video_filename(post_url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(post_url.as_bytes()));
    format!("video_{}.mp4", &digest[..8])
}

/// Images over HTTP, videos through an external downloader such as `yt-dlp`.
pub struct HttpMediaFetcher {
    http: reqwest::Client,
    video_tool: String,
    video_timeout: Duration,
}

impl HttpMediaFetcher {
    pub fn new(config: &ImportConfig) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(config.image_timeout)
            .user_agent("memos-sync/0.1")
            .build()?;
        Ok(Self {
            http,
            video_tool: config.video_tool.clone(),
            video_timeout: config.video_timeout,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Attachment, MediaError> {
        let url = normalize_image_url(url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::Status {
                status: response.status(),
                url,
            });
        }
        let bytes = response.bytes().await?.to_vec();

        Ok(Attachment {
            filename: image_filename(&url),
            mime_type: "image/jpeg".to_string(),
            bytes,
        })
    }

    async fn fetch_video(&self, post_url: &str) -> Result<Attachment, MediaError> {
        // Removed with everything in it when `workdir` drops.
        let workdir = tempfile::tempdir()?;
        let filename = video_filename(post_url);
        let output_path = workdir.path().join(&filename);

        log::info!("downloading video for {} with {}", post_url, self.video_tool);
        let run = Command::new(&self.video_tool)
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--format")
            .arg("best[ext=mp4]/best")
            .arg("--output")
            .arg(&output_path)
            .arg(post_url)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.video_timeout, run)
            .await
            .map_err(|_| MediaError::Timeout(self.video_timeout))??;

        if !output.status.success() {
            return Err(MediaError::Tool {
                tool: self.video_tool.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output_path.exists() {
            return Err(MediaError::MissingOutput(filename));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        log::info!(
            "video downloaded ({:.2} MB)",
            bytes.len() as f64 / 1024.0 / 1024.0
        );

        Ok(Attachment {
            filename,
            mime_type: "video/mp4".to_string(),
            bytes,
        })
    }
}
