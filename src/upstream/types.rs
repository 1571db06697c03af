//! Wire types shared by every upstream endpoint.
//!
//! All responses arrive wrapped in an [`Envelope`] whose numeric `code` is
//! 200 on success. The field names in [`ContentItem`] are a compatibility
//! contract with the upstream and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::UpstreamError;

/// Standard response wrapper: `{"code": 200, "message": "...", "result": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Envelope {
    /// Turn a non-200 envelope into an error, keep the rest.
    pub fn into_success(self) -> Result<Self, UpstreamError> {
        if self.code == 200 {
            return Ok(self);
        }
        let message = match self.message {
            Some(m) if !m.is_empty() => m,
            _ => self
                .result
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "no message".to_string()),
        };
        Err(UpstreamError::Envelope {
            code: self.code,
            message,
        })
    }

    /// `result.taskId` of a submit response, as a string.
    pub fn task_id(&self) -> Result<String, UpstreamError> {
        self.result
            .as_ref()
            .and_then(|r| r.get("taskId"))
            .and_then(value_as_string)
            .ok_or(UpstreamError::MissingField("result.taskId"))
    }
}

/// One entry of `params.content`. Text must precede images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "imgUrl")]
        img_url: String,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentItem::Image {
            img_url: url.into(),
        }
    }
}

/// Upstream ids are sometimes strings and sometimes numbers.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
