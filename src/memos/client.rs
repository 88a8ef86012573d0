use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Response;
use std::time::Duration;

use super::types::{
    CreateAttachmentRequest, CreateMemoRequest, ListMemosResponse, NamedResource,
    UpdateMemoRequest,
};
use crate::config::MemosConfig;
use crate::error::MemosError;
use crate::models::Attachment;
use crate::service::{NotesService, PageOutcome};

/// HTTP client for a self-hosted Memos instance.
#[derive(Clone)]
pub struct MemosClient {
    http: reqwest::Client,
    config: MemosConfig,
    video_upload_timeout: Duration,
}

impl MemosClient {
    pub fn new(config: MemosConfig) -> Result<Self, MemosError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("memos-sync/0.1")
            .build()
            .map_err(MemosError::Http)?;

        Ok(Self {
            http: client,
            config,
            video_upload_timeout: Duration::from_secs(120),
        })
    }

    /// Video uploads are large; they get their own request timeout.
    pub fn with_video_upload_timeout(mut self, timeout: Duration) -> Self {
        self.video_upload_timeout = timeout;
        self
    }

    pub fn config(&self) -> &MemosConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn fetch_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListMemosResponse, MemosError> {
        let mut query = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(self.endpoint("memos"))
            .bearer_auth(&self.config.token)
            .query(&query)
            .send()
            .await?;

        let body = ensure_success(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, MemosError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(MemosError::status(status, body))
    }
}

async fn resource_name(response: Response) -> Result<String, MemosError> {
    let body = ensure_success(response).await?.bytes().await?;
    let named: NamedResource = serde_json::from_slice(&body)?;
    named
        .name
        .filter(|name| !name.is_empty())
        .ok_or(MemosError::MissingName)
}

#[async_trait]
impl NotesService for MemosClient {
    async fn list_page(&self, page_token: Option<&str>) -> PageOutcome {
        match self.fetch_page(page_token).await {
            Ok(page) if page.memos.is_empty() => {
                log::info!("page returned no memos, end of stream");
                PageOutcome::EndOfStream
            }
            Ok(page) => {
                let total = page.memos.len();
                let records: Vec<_> = page
                    .memos
                    .into_iter()
                    .filter_map(|memo| {
                        if memo.identifier().is_none() {
                            log::warn!("dropping memo without a usable name or id: {:?}", memo);
                            return None;
                        }
                        memo.into_record()
                    })
                    .collect();
                let malformed = total - records.len();
                PageOutcome::Page {
                    records,
                    next_token: page.next_page_token.filter(|token| !token.is_empty()),
                    malformed,
                }
            }
            // The list endpoint answers 400 once the token runs past the last page.
            Err(err) if err.is_bad_request() => {
                log::warn!("page rejected ({}), treating as end of results", err);
                PageOutcome::EndOfStream
            }
            Err(err) => PageOutcome::FetchFailed(err.to_string()),
        }
    }

    async fn delete_record(&self, identifier: &str) -> Result<(), MemosError> {
        let response = self
            .http
            .delete(self.endpoint(identifier))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn create_record(&self, content: &str) -> Result<String, MemosError> {
        let payload = CreateMemoRequest {
            content,
            visibility: &self.config.visibility,
        };
        let response = self
            .http
            .post(self.endpoint("memos"))
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;
        resource_name(response).await
    }

    async fn set_created_at(&self, identifier: &str, created_at: &str) -> Result<(), MemosError> {
        let response = self
            .http
            .patch(self.endpoint(identifier))
            .bearer_auth(&self.config.token)
            .json(&UpdateMemoRequest {
                create_time: created_at,
            })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn create_attachment(
        &self,
        parent: &str,
        attachment: &Attachment,
    ) -> Result<String, MemosError> {
        let payload = CreateAttachmentRequest {
            filename: &attachment.filename,
            content: STANDARD.encode(&attachment.bytes),
            mime_type: &attachment.mime_type,
            memo: parent,
        };

        let mut request = self
            .http
            .post(self.endpoint("attachments"))
            .bearer_auth(&self.config.token)
            .json(&payload);
        if attachment.mime_type.starts_with("video/") {
            request = request.timeout(self.video_upload_timeout);
        }

        resource_name(request.send().await?).await
    }
}
