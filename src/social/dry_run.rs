//! Dry-run client: nothing leaves the machine.
//!
//! Uploaded images are written to a local directory together with their
//! alt text, and statuses are logged and written next to them. Ids are
//! random so replies can still be threaded through the run.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use super::{MediaAttachment, PostedStatus, SocialClient, SocialError, StatusRequest};
use crate::types::RenderedImage;

pub struct DryRunClient {
    output_dir: PathBuf,
}

impl DryRunClient {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    async fn write(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, SocialError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                SocialError::Local(format!("Cannot create {}: {e}", self.output_dir.display()))
            })?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| SocialError::Local(format!("Cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}

#[async_trait]
impl SocialClient for DryRunClient {
    async fn upload_media(
        &self,
        image: &RenderedImage,
        description: &str,
    ) -> Result<MediaAttachment, SocialError> {
        let id = Uuid::new_v4().to_string();
        let path = self.write(&format!("{id}.png"), image.as_bytes()).await?;
        self.write(&format!("{id}.txt"), description.as_bytes()).await?;

        info!(media_id = %id, path = %path.display(), "[DRY RUN] Would upload media");

        Ok(MediaAttachment {
            id,
            rate_limit_remaining: None,
        })
    }

    async fn create_status(&self, request: &StatusRequest) -> Result<PostedStatus, SocialError> {
        let id = Uuid::new_v4().to_string();
        self.write(&format!("status-{id}.txt"), request.text.as_bytes())
            .await?;

        info!(
            status_id = %id,
            media = ?request.media_ids,
            in_reply_to = ?request.in_reply_to_id,
            text = %request.text,
            "[DRY RUN] Would post status"
        );

        Ok(PostedStatus {
            id,
            uri: None,
            rate_limit_remaining: None,
        })
    }
}
