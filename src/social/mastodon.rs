//! Mastodon REST client.
//!
//! Two endpoints are used: `POST /api/v1/media` (multipart upload with alt
//! text) and `POST /api/v1/statuses`. Authentication is a bearer token.
//! Each call reports the `X-RateLimit-Remaining` header so the publisher
//! can warn when the budget is exhausted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{MediaAttachment, PostedStatus, SocialClient, SocialError, StatusRequest, Visibility};
use crate::config::MastodonCredentials;
use crate::types::RenderedImage;

const MEDIA_PATH: &str = "/api/v1/media";
const STATUSES_PATH: &str = "/api/v1/statuses";
const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    media_ids: &'a [String],
    visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
    #[serde(default)]
    uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MastodonClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl MastodonClient {
    pub fn new(credentials: MastodonCredentials, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Mastodon HTTP client")?;

        Ok(Self {
            http,
            base_url: credentials.base_url,
            token: credentials.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a response into its body or a classified error.
    async fn check(response: Response) -> Result<(HeaderMap, Response), SocialError> {
        let status = response.status();
        if status.is_success() {
            return Ok((response.headers().clone(), response));
        }
        let body = response.text().await.unwrap_or_default();
        Err(SocialError::from_status(status.as_u16(), body))
    }
}

/// Parse the remaining request budget, if the server reports one.
pub fn rate_limit_remaining(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(RATE_LIMIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl SocialClient for MastodonClient {
    async fn upload_media(
        &self,
        image: &RenderedImage,
        description: &str,
    ) -> Result<MediaAttachment, SocialError> {
        let part = Part::bytes(image.as_bytes().to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| SocialError::Transport(format!("Invalid media part: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("description", description.to_string());

        let response = self
            .http
            .post(self.url(MEDIA_PATH))
            .bearer_auth(self.token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| SocialError::Transport(e.to_string()))?;

        let (headers, response) = Self::check(response).await?;
        let body: MediaResponse = response
            .json()
            .await
            .map_err(|e| SocialError::Transport(format!("Failed to parse media response: {e}")))?;

        debug!(media_id = %body.id, bytes = image.len(), "Media uploaded");

        Ok(MediaAttachment {
            id: body.id,
            rate_limit_remaining: rate_limit_remaining(&headers),
        })
    }

    async fn create_status(&self, request: &StatusRequest) -> Result<PostedStatus, SocialError> {
        let body = StatusBody {
            status: &request.text,
            media_ids: &request.media_ids,
            visibility: request.visibility,
            in_reply_to_id: request.in_reply_to_id.as_deref(),
        };

        let response = self
            .http
            .post(self.url(STATUSES_PATH))
            .bearer_auth(self.token.expose_secret())
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SocialError::Transport(e.to_string()))?;

        let (headers, response) = Self::check(response).await?;
        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| SocialError::Transport(format!("Failed to parse status response: {e}")))?;

        Ok(PostedStatus {
            id: status.id,
            uri: status.uri,
            rate_limit_remaining: rate_limit_remaining(&headers),
        })
    }
}
