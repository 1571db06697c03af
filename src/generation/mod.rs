//! Submit/poll adapter shared by image and video generation.
//!
//! A [`GenerationKind`] describes one job kind: its payload schema, its
//! endpoints, its timing, and how to read a status response. [`Generator`]
//! runs the common sequence for any kind:
//!
//! ```text
//! visit → resolve references → submit → poll until terminal or budget spent
//! ```
//!
//! Nothing in here retries. The first failure is the job's failure.

pub mod image;
pub mod models;
pub mod poll;
pub mod video;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::state_machine::{JobFailure, JobResult};
use crate::upload::{AssetUploader, ResolvedAsset, UploadError, UploadStrategy};
use crate::upstream::{ContentItem, Session, UpstreamClient, UpstreamError};

pub use image::{ImageGeneration, ImageSubmission};
pub use models::{AspectFormat, CATALOG, ImageModel};
pub use poll::{Attempt, Clock, PollSchedule, TokioClock, poll_until};
pub use video::{VideoGeneration, VideoSubmission};

/// Longest reference URL echoed into logs.
const LOG_URL_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The upstream reported the task as failed.
    #[error("generation failed: {0}")]
    TaskFailed(String),

    #[error("generation timed out after {polls} polls ({}s)", .waited.as_secs())]
    Timeout { polls: u32, waited: Duration },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Upstream(e) => e.kind(),
            GenerationError::Upload(UploadError::InvalidDataUri(_)) => ErrorKind::InvalidInput,
            GenerationError::Upload(_) => ErrorKind::Upload,
            GenerationError::TaskFailed(_) => ErrorKind::Upstream,
            GenerationError::Timeout { .. } => ErrorKind::Timeout,
            GenerationError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn to_failure(&self) -> JobFailure {
        JobFailure::new(self.kind(), self.to_string())
    }
}

/// Descriptor for one kind of generation job.
pub trait GenerationKind: Send + Sync {
    type Payload: Serialize + Send + Sync;

    /// Short name used in logs.
    fn label(&self) -> &'static str;

    fn prompt(&self) -> &str;

    /// Reference images still to be resolved, in submission order.
    fn references(&self) -> &[String];

    fn upload_strategy(&self) -> UploadStrategy;

    fn submit_path(&self) -> &'static str;

    fn status_path(&self, task_id: &str) -> String;

    fn schedule(&self) -> PollSchedule;

    /// Build the submit body around an already ordered `[text, image*]`
    /// content list.
    fn payload(&self, content: Vec<ContentItem>) -> Self::Payload;

    /// Read one status response's `result` object.
    fn interpret(&self, result: Option<&Value>) -> Result<Attempt<JobResult>, GenerationError>;
}

/// Drives any [`GenerationKind`] against the upstream.
pub struct Generator {
    client: UpstreamClient,
    uploader: AssetUploader,
    clock: Arc<dyn Clock>,
}

impl Generator {
    pub fn new(client: UpstreamClient, uploader: AssetUploader, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            uploader,
            clock,
        }
    }

    pub async fn run<K: GenerationKind>(&self, job: &K) -> Result<JobResult, GenerationError> {
        let session = self.client.visit().await?;
        let content = self.build_content(job, &session).await?;

        let payload = job.payload(content);
        let envelope = self
            .client
            .post(job.submit_path(), &payload, &session)
            .await?;
        let task_id = envelope.task_id()?;
        tracing::info!(kind = job.label(), task_id = %task_id, "Upstream task submitted");

        let status_path = job.status_path(&task_id);
        let client = &self.client;
        let session = &session;
        let status_path = status_path.as_str();
        let task_id = task_id.as_str();

        poll_until(self.clock.as_ref(), job.schedule(), |attempt| async move {
            let envelope = client.get(status_path, session).await?;
            if attempt % 10 == 1 {
                tracing::debug!(task_id, attempt, result = ?envelope.result, "Poll response");
            }
            job.interpret(envelope.result.as_ref())
        })
        .await
    }

    async fn build_content<K: GenerationKind>(
        &self,
        job: &K,
        session: &Session,
    ) -> Result<Vec<ContentItem>, GenerationError> {
        let references = job.references();
        let mut content = Vec::with_capacity(1 + references.len());
        content.push(ContentItem::text(job.prompt()));

        for (index, reference) in references.iter().enumerate() {
            let asset = self
                .uploader
                .resolve(reference, job.upload_strategy(), session)
                .await?;
            if let ResolvedAsset::Uploaded(url) | ResolvedAsset::Hosted(url) = &asset {
                tracing::debug!(
                    index = index + 1,
                    total = references.len(),
                    url = %url.chars().take(LOG_URL_CHARS).collect::<String>(),
                    "Reference image resolved"
                );
            }
            content.push(ContentItem::image(asset.into_url()));
        }
        Ok(content)
    }
}

/// `result.message`, falling back to the raw status word.
fn failure_message(result: &Value, status: &str) -> String {
    result
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(status)
        .to_string()
}
