use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::poll::{Attempt, PollSchedule};
use super::{GenerationError, GenerationKind, failure_message};
use crate::config::PollConfig;
use crate::state_machine::{GenType, JobResult, VideoRequest};
use crate::upload::UploadStrategy;
use crate::upstream::ContentItem;

const SUBMIT_PATH: &str = "/gen/videos/model-video/generate";
const FEATURE_CODE: &str = "k_seedance";
const VIDEO_MODEL: &str = "k-seedance";

const DEFAULT_RATIO: &str = "16:9";
const DEFAULT_RESOLUTION: &str = "720p";
const DEFAULT_DURATION: u32 = 5;
const DEFAULT_MODE: &str = "pro";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSubmission {
    pub prompt: String,
    #[serde(default)]
    pub ratio: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub mode: Option<String>,
    /// At most one reference image; its presence makes the job image-to-video.
    #[serde(default)]
    pub reference_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPayload {
    feature_code: &'static str,
    model: &'static str,
    params: VideoParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParams {
    content: Vec<ContentItem>,
    command: VideoCommand,
    is_frames: bool,
    mode: String,
}

#[derive(Debug, Serialize)]
struct VideoCommand {
    #[serde(rename = "type")]
    gen_type: GenType,
    resolution: String,
    duration: u32,
    mode: String,
    /// Image-to-video takes its framing from the reference, so no ratio.
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoGeneration {
    request: VideoRequest,
    references: Vec<String>,
    schedule: PollSchedule,
}

impl VideoGeneration {
    pub fn prepare(
        submission: VideoSubmission,
        poll: &PollConfig,
    ) -> Result<Self, GenerationError> {
        if submission.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidInput("prompt must not be empty".into()));
        }

        let references: Vec<String> = submission
            .reference_image
            .filter(|r| !r.trim().is_empty())
            .into_iter()
            .collect();
        let gen_type = if references.is_empty() {
            GenType::T2v
        } else {
            GenType::I2v
        };

        Ok(Self {
            request: VideoRequest {
                prompt: submission.prompt,
                gen_type,
                ratio: or_default(submission.ratio, DEFAULT_RATIO),
                resolution: or_default(submission.resolution, DEFAULT_RESOLUTION),
                duration: submission
                    .duration
                    .filter(|d| *d > 0)
                    .unwrap_or(DEFAULT_DURATION),
                mode: or_default(submission.mode, DEFAULT_MODE),
                has_reference_image: !references.is_empty(),
            },
            references,
            schedule: PollSchedule::from(poll),
        })
    }

    pub fn request(&self) -> &VideoRequest {
        &self.request
    }
}

impl GenerationKind for VideoGeneration {
    type Payload = VideoPayload;

    fn label(&self) -> &'static str {
        "video"
    }

    fn prompt(&self) -> &str {
        &self.request.prompt
    }

    fn references(&self) -> &[String] {
        &self.references
    }

    fn upload_strategy(&self) -> UploadStrategy {
        UploadStrategy::Signed
    }

    fn submit_path(&self) -> &'static str {
        SUBMIT_PATH
    }

    fn status_path(&self, task_id: &str) -> String {
        format!("/gen/videos/model-video/{task_id}")
    }

    fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    fn payload(&self, content: Vec<ContentItem>) -> VideoPayload {
        let req = &self.request;
        VideoPayload {
            feature_code: FEATURE_CODE,
            model: VIDEO_MODEL,
            params: VideoParams {
                content,
                command: VideoCommand {
                    gen_type: req.gen_type,
                    resolution: req.resolution.clone(),
                    duration: req.duration,
                    mode: req.mode.clone(),
                    ratio: (req.gen_type == GenType::T2v).then(|| req.ratio.clone()),
                },
                is_frames: false,
                mode: req.mode.clone(),
            },
        }
    }

    fn interpret(&self, result: Option<&Value>) -> Result<Attempt<JobResult>, GenerationError> {
        let Some(result) = result else {
            return Ok(Attempt::Pending);
        };

        let url = |key: &str| {
            result
                .get(key)
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        };

        match result.get("taskStatus").and_then(Value::as_str) {
            Some("succeed") => match url("videoUrl") {
                Some(video_url) => Ok(Attempt::Done(JobResult::Video {
                    video_url,
                    thumbnail_url: url("thumbnailUrl"),
                })),
                None => Ok(Attempt::Pending),
            },
            Some(status @ ("failed" | "error")) => {
                Err(GenerationError::TaskFailed(failure_message(result, status)))
            }
            _ => Ok(Attempt::Pending),
        }
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
