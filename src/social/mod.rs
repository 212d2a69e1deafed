//! Social network integrations.
//!
//! Defines the `SocialClient` trait and provides implementations for:
//! - Mastodon: media upload plus status creation over the REST API
//! - Dry run: writes images to a local directory and posts nothing
//!
//! Clients perform exactly one HTTP exchange per call. Retries live in
//! `engine::publisher`, which decides based on `SocialError::is_retryable`.

pub mod dry_run;
pub mod mastodon;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{PipelineError, RenderedImage};

pub use dry_run::DryRunClient;
pub use mastodon::MastodonClient;

/// Error returned by a single call to a social network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocialError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("HTTP 429: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Local output failed; only the dry-run client produces this.
    #[error("Local output error: {0}")]
    Local(String),
}

impl SocialError {
    /// Transport failures, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SocialError::Rejected { .. } | SocialError::Local(_))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => SocialError::RateLimited(body),
            s if s >= 500 => SocialError::Server { status: s, body },
            s => SocialError::Rejected { status: s, body },
        }
    }
}

/// A failure that is not retried. Retryable errors only surface as
/// `PublishTransport` once attempts run out.
impl From<SocialError> for PipelineError {
    fn from(error: SocialError) -> Self {
        match error {
            SocialError::Rejected { status, body } => PipelineError::PublishRejected {
                status,
                message: body,
            },
            other => PipelineError::PublishTransport {
                attempts: 1,
                message: other.to_string(),
            },
        }
    }
}

/// An uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub id: String,
    pub rate_limit_remaining: Option<u32>,
}

/// A created status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    pub id: String,
    pub uri: Option<String>,
    pub rate_limit_remaining: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
}

/// Everything needed to create one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub text: String,
    pub media_ids: Vec<String>,
    pub visibility: Visibility,
    pub in_reply_to_id: Option<String>,
    /// Sent as `Idempotency-Key` so a retried create is not duplicated.
    pub idempotency_key: String,
}

/// Abstraction over the network the bot posts to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Upload a PNG with its alt text.
    async fn upload_media(
        &self,
        image: &RenderedImage,
        description: &str,
    ) -> Result<MediaAttachment, SocialError>;

    /// Create a status referencing previously uploaded media.
    async fn create_status(&self, request: &StatusRequest) -> Result<PostedStatus, SocialError>;
}
