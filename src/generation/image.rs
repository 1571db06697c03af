use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::models::{DEFAULT_IMAGE_MODEL, ImageModel};
use super::poll::{Attempt, PollSchedule};
use super::{GenerationError, GenerationKind, failure_message};
use crate::config::PollConfig;
use crate::state_machine::{GenType, ImageRef, ImageRequest, JobResult};
use crate::upload::UploadStrategy;
use crate::upstream::ContentItem;

const SUBMIT_PATH: &str = "/gen/v2/genImg";
const DEFAULT_RESOLUTION: &str = "2K";
const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Image job parameters as a caller hands them in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSubmission {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Single reference, placed before `reference_images`.
    #[serde(default)]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    gen_type: &'static str,
    model: &'static str,
    params: ImageParams,
}

#[derive(Debug, Serialize)]
struct ImageParams {
    content: Vec<ContentItem>,
    command: ImageCommand,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageCommand {
    #[serde(rename = "type")]
    gen_type: GenType,
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<String>,
}

/// A normalized image job, ready to run.
#[derive(Debug, Clone)]
pub struct ImageGeneration {
    request: ImageRequest,
    model: &'static ImageModel,
    references: Vec<String>,
    schedule: PollSchedule,
}

impl ImageGeneration {
    /// Apply defaults, resolve the model, and drop reference images the
    /// model cannot use.
    pub fn prepare(
        submission: ImageSubmission,
        poll: &PollConfig,
    ) -> Result<Self, GenerationError> {
        if submission.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidInput("prompt must not be empty".into()));
        }

        let requested =
            non_empty(submission.model).unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let model = ImageModel::resolve(&requested);

        let mut references: Vec<String> = submission
            .reference_image
            .into_iter()
            .chain(submission.reference_images)
            .filter(|r| !r.trim().is_empty())
            .collect();
        let supplied = references.len();
        if supplied > 0 && !model.supports_i2i {
            tracing::warn!(
                model = model.id,
                dropped = supplied,
                "Model has no image-to-image support, dropping reference images"
            );
            references.clear();
        }

        let gen_type = if references.is_empty() {
            GenType::T2i
        } else {
            GenType::I2i
        };

        Ok(Self {
            request: ImageRequest {
                prompt: submission.prompt,
                model: requested,
                mapped_model: model.id.to_string(),
                resolution: non_empty(submission.resolution)
                    .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string()),
                aspect_ratio: non_empty(submission.aspect_ratio)
                    .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string()),
                gen_type,
                reference_images_count: supplied,
            },
            model,
            references,
            schedule: PollSchedule::from(poll),
        })
    }

    pub fn request(&self) -> &ImageRequest {
        &self.request
    }
}

impl GenerationKind for ImageGeneration {
    type Payload = ImagePayload;

    fn label(&self) -> &'static str {
        "image"
    }

    fn prompt(&self) -> &str {
        &self.request.prompt
    }

    fn references(&self) -> &[String] {
        &self.references
    }

    fn upload_strategy(&self) -> UploadStrategy {
        self.model.upload
    }

    fn submit_path(&self) -> &'static str {
        SUBMIT_PATH
    }

    fn status_path(&self, task_id: &str) -> String {
        format!("/gen/v2/imgResult/{task_id}")
    }

    fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    fn payload(&self, content: Vec<ContentItem>) -> ImagePayload {
        ImagePayload {
            gen_type: self.model.gen_type,
            model: self.model.model,
            params: ImageParams {
                content,
                command: ImageCommand {
                    gen_type: self.request.gen_type,
                    aspect_ratio: self.model.format_aspect(&self.request.aspect_ratio),
                    resolution: self
                        .model
                        .supports_resolution
                        .then(|| self.request.resolution.clone()),
                },
            },
        }
    }

    fn interpret(&self, result: Option<&Value>) -> Result<Attempt<JobResult>, GenerationError> {
        let Some(result) = result else {
            return Ok(Attempt::Pending);
        };

        if let Some(status @ ("failed" | "error")) = result.get("status").and_then(Value::as_str) {
            return Err(GenerationError::TaskFailed(failure_message(result, status)));
        }

        let images: Vec<ImageRef> = result
            .get("images")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("url").and_then(Value::as_str).or(item.as_str()))
                    .filter(|url| !url.is_empty())
                    .map(|url| ImageRef {
                        url: url.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if images.is_empty() {
            Ok(Attempt::Pending)
        } else {
            Ok(Attempt::Done(JobResult::Images { images }))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
