//! Fallback upload path: an anonymous, time-limited public file host.

use reqwest::Client;
use reqwest::multipart::{Form, Part};

use super::data_uri::DataUri;

pub struct PublicHostUploader {
    http: Client,
    endpoint: String,
}

impl PublicHostUploader {
    pub fn new(http: Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    /// Returns the hosted URL, or `None` on any failure.
    pub async fn upload(&self, asset: &DataUri) -> Option<String> {
        let part = match Part::bytes(asset.bytes.clone())
            .file_name(format!("upload.{}", asset.extension()))
            .mime_str(&asset.mime)
        {
            Ok(part) => part,
            Err(e) => {
                tracing::warn!(mime = %asset.mime, error = %e, "Public host rejected MIME type");
                return None;
            }
        };
        let form = Form::new()
            .text("reqtype", "fileupload")
            .text("time", "1h")
            .part("fileToUpload", part);

        let response = match self.http.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Public host upload failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Public host upload rejected");
            return None;
        }

        match response.text().await {
            Ok(body) if body.trim().starts_with("http") => {
                let url = body.trim().to_string();
                tracing::debug!(url = %url, "Public host upload stored");
                Some(url)
            }
            Ok(body) => {
                let preview: String = body.chars().take(200).collect();
                tracing::warn!(body = %preview, "Public host returned no URL");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Public host response unreadable");
                None
            }
        }
    }
}
