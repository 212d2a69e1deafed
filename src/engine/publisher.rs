//! Publication orchestrator.
//!
//! Publishing is two steps: upload the image with its alt text, then
//! create a status that references the uploaded media. Each step is
//! retried independently on transient failures with exponential backoff.
//! The status carries an idempotency key so a create that succeeded
//! server-side but failed in transit is not posted twice.

use sha2::{Digest, Sha256};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PublishConfig;
use crate::social::{SocialClient, SocialError, StatusRequest, Visibility};
use crate::types::{PipelineError, RenderedImage, Thread};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

impl From<&PublishConfig> for RetryPolicy {
    fn from(config: &PublishConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: config.base_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What to publish for one scope.
#[derive(Debug)]
pub struct Post {
    pub image: RenderedImage,
    /// Alt text for the image.
    pub description: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub media_id: String,
    pub status_id: String,
    pub uri: Option<String>,
    pub thread: Thread,
}

/// Hex SHA-256 of the status text.
pub fn idempotency_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

pub struct Publisher<'a> {
    client: &'a dyn SocialClient,
    retry: RetryPolicy,
}

impl<'a> Publisher<'a> {
    pub fn new(client: &'a dyn SocialClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Upload the image, then post the status, optionally as a reply.
    pub async fn publish(
        &self,
        post: Post,
        reply_to: Option<&Thread>,
    ) -> Result<Publication, PipelineError> {
        let Post {
            image,
            description,
            text,
        } = post;

        let media = self
            .with_retry("upload media", || {
                self.client.upload_media(&image, &description)
            })
            .await?;
        warn_if_exhausted(media.rate_limit_remaining, "upload media");

        let request = StatusRequest {
            idempotency_key: idempotency_key(&text),
            text,
            media_ids: vec![media.id.clone()],
            visibility: Visibility::Public,
            in_reply_to_id: reply_to.map(|t| t.status_id.clone()),
        };

        let status = self
            .with_retry("create status", || self.client.create_status(&request))
            .await?;
        warn_if_exhausted(status.rate_limit_remaining, "create status");

        info!(
            media_id = %media.id,
            status_id = %status.id,
            reply_to = ?request.in_reply_to_id,
            "Status published"
        );

        Ok(Publication {
            media_id: media.id,
            thread: Thread {
                status_id: status.id.clone(),
                uri: status.uri.clone(),
            },
            status_id: status.id,
            uri: status.uri,
        })
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SocialError>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.backoff(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, operation, "Retrying");
                tokio::time::sleep(delay).await;
            }

            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!(operation, error = %e, "Request rejected");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(attempt, operation, error = %e, "Retryable publish error");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(PipelineError::PublishTransport {
            attempts: self.retry.max_retries + 1,
            message: format!("{operation}: {}", last_error.unwrap_or_default()),
        })
    }
}

fn warn_if_exhausted(remaining: Option<u32>, operation: &str) {
    if remaining == Some(0) {
        warn!(operation, "Rate limit exhausted");
    }
}
