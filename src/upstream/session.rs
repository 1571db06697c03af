//! Anonymous upstream identity acquired once per job.

use reqwest::header::{HeaderMap, SET_COOKIE};
use serde_json::Value;

use super::error::UpstreamError;
use super::types::{Envelope, value_as_string};

/// Bearer token plus the correlation cookies the upstream expects on every
/// later call of the same job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Option<String>,
    /// `name=value; name=value`, ready for a `Cookie` header.
    pub cookies: Option<String>,
}

impl Session {
    /// Build a session from a `user/visit` envelope.
    ///
    /// Older upstream versions return `result.{token,id}`, newer ones nest
    /// the same fields under `result.user`.
    pub fn from_visit(envelope: Envelope, cookies: Option<String>) -> Result<Self, UpstreamError> {
        let envelope = envelope.into_success()?;
        let result = envelope
            .result
            .as_ref()
            .ok_or(UpstreamError::MissingField("result"))?;
        let identity = result.get("user").filter(|u| u.is_object()).unwrap_or(result);

        let token = identity
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(UpstreamError::MissingField("result.token"))?;

        Ok(Self {
            token: token.to_string(),
            user_id: identity.get("id").and_then(value_as_string),
            cookies,
        })
    }
}

/// Reduce every `Set-Cookie` header to its `name=value` part.
pub(crate) fn collect_cookies(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
