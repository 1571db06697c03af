use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Opaque job handle returned to callers at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocates a fresh, never-reused identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Video,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Image => write!(f, "image"),
            JobKind::Video => write!(f, "video"),
        }
    }
}

/// Tracks the lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Upstream command type: text- or image-conditioned, image or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenType {
    T2i,
    I2i,
    T2v,
    I2v,
}

/// Normalized image parameters captured at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub prompt: String,
    /// Model name exactly as the caller sent it.
    pub model: String,
    /// Catalog id the name resolved to.
    pub mapped_model: String,
    pub resolution: String,
    pub aspect_ratio: String,
    pub gen_type: GenType,
    pub reference_images_count: usize,
}

/// Normalized video parameters captured at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub prompt: String,
    #[serde(rename = "type")]
    pub gen_type: GenType,
    pub ratio: String,
    pub resolution: String,
    pub duration: u32,
    pub mode: String,
    pub has_reference_image: bool,
}

/// Immutable request snapshot. Reference image payloads are not kept here,
/// only their count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobRequest {
    Image(ImageRequest),
    Video(VideoRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Image(_) => JobKind::Image,
            JobRequest::Video(_) => JobKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// Adapter-specific output of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Images {
        images: Vec<ImageRef>,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        video_url: String,
        thumbnail_url: Option<String>,
    },
}

/// Terminal failure recorded on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// One orchestration-tracked generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    /// Caller-attached identity, opaque to the engine.
    pub owner: Option<String>,
    pub status: JobStatus,
    pub request: JobRequest,
    pub result: Option<JobResult>,
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(request: JobRequest, owner: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::generate(),
            kind: request.kind(),
            owner,
            status: JobStatus::Queued,
            request,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            kind: self.kind,
            status: self.status,
            request: self.request.clone(),
            result: self.result.clone(),
            error: self.error.as_ref().map(|e| e.message.clone()),
            error_kind: self.error.as_ref().map(|e| e.kind),
            created_at: self.created_at.timestamp_millis(),
            updated_at: self.updated_at.timestamp_millis(),
        }
    }
}

/// What the status endpoint hands back to a polling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub request: JobRequest,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_request() -> JobRequest {
        JobRequest::Image(ImageRequest {
            prompt: "a red fox".into(),
            model: "nano-banana-pro".into(),
            mapped_model: "kie_nano_banana_pro".into(),
            resolution: "2K".into(),
            aspect_ratio: "1:1".into(),
            gen_type: GenType::T2i,
            reference_images_count: 0,
        })
    }

    #[test]
    fn job_creation_defaults() {
        let now = Utc::now();
        let job = Job::new(image_request(), Some("user-7".into()), now);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.kind, JobKind::Image);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn job_ids_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn view_serializes_with_nulls_while_pending() {
        let job = Job::new(image_request(), None, Utc::now());
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "queued");
        assert!(json["result"].is_null());
        assert!(json["error"].is_null());
        assert!(json["errorKind"].is_null());
        assert_eq!(json["request"]["mappedModel"], "kie_nano_banana_pro");
        assert_eq!(json["request"]["genType"], "t2i");
        assert_eq!(json["request"]["referenceImagesCount"], 0);
        assert!(json["createdAt"].is_i64());
    }

    #[test]
    fn video_request_uses_type_key() {
        let req = JobRequest::Video(VideoRequest {
            prompt: "waves".into(),
            gen_type: GenType::I2v,
            ratio: "16:9".into(),
            resolution: "720p".into(),
            duration: 5,
            mode: "pro".into(),
            has_reference_image: true,
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "i2v");
        assert_eq!(json["hasReferenceImage"], true);
        assert_eq!(req.kind(), JobKind::Video);
    }

    #[test]
    fn video_result_serializes_camel_case() {
        let result = JobResult::Video {
            video_url: "https://x/v.mp4".into(),
            thumbnail_url: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["videoUrl"], "https://x/v.mp4");
        assert!(json["thumbnailUrl"].is_null());
    }

    #[test]
    fn failure_display() {
        let failure = JobFailure::new(ErrorKind::Timeout, "gave up after 2 polls");
        assert_eq!(failure.to_string(), "timeout error: gave up after 2 polls");
    }
}
