//! Turns caller-supplied reference images into something the upstream can
//! dereference.
//!
//! Resolution order for a data URI:
//! 1. signed handshake upload, when the model asks for it;
//! 2. the public fallback host;
//! 3. the original data URI, inline (best effort).
//!
//! Only a malformed reference is an error; every upload failure degrades.

pub mod cipher;
pub mod data_uri;
pub mod public_host;
pub mod signed;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::{Session, UpstreamError};

pub use cipher::HandshakeCipher;
pub use data_uri::DataUri;
pub use public_host::PublicHostUploader;
pub use signed::SignedUploader;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("handshake cipher error: {0}")]
    Cipher(String),

    #[error("upload handshake failed: {0}")]
    Handshake(#[from] UpstreamError),

    #[error("storage rejected upload with HTTP {status}")]
    PutRejected { status: u16 },

    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upload URL: {0}")]
    InvalidUrl(String),
}

/// Which path a model's reference images take first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStrategy {
    /// Encrypted handshake + pre-signed PUT, falling back to the public host.
    Signed,
    /// Public host only.
    PublicHost,
}

/// Where a reference image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAsset {
    /// Already an `http(s)` URL; sent untouched.
    Hosted(String),
    /// Uploaded by one of the strategies.
    Uploaded(String),
    /// Every upload failed; the data URI is sent as-is.
    Inline(String),
}

impl ResolvedAsset {
    pub fn into_url(self) -> String {
        match self {
            ResolvedAsset::Hosted(url)
            | ResolvedAsset::Uploaded(url)
            | ResolvedAsset::Inline(url) => url,
        }
    }
}

pub struct AssetUploader {
    signed: SignedUploader,
    public_host: PublicHostUploader,
}

impl AssetUploader {
    pub fn new(signed: SignedUploader, public_host: PublicHostUploader) -> Self {
        Self {
            signed,
            public_host,
        }
    }

    pub async fn resolve(
        &self,
        reference: &str,
        strategy: UploadStrategy,
        session: &Session,
    ) -> Result<ResolvedAsset, UploadError> {
        if reference.starts_with("https://") || reference.starts_with("http://") {
            return Ok(ResolvedAsset::Hosted(reference.to_string()));
        }

        let asset = DataUri::parse(reference)?;

        if strategy == UploadStrategy::Signed {
            match self.signed.upload(&asset, session).await {
                Ok(url) => return Ok(ResolvedAsset::Uploaded(url)),
                Err(e) => {
                    tracing::warn!(error = %e, "Signed upload failed, trying public host");
                }
            }
        }

        match self.public_host.upload(&asset).await {
            Some(url) => Ok(ResolvedAsset::Uploaded(url)),
            None => {
                tracing::warn!(
                    bytes = asset.bytes.len(),
                    "All uploads failed, sending reference inline"
                );
                Ok(ResolvedAsset::Inline(reference.to_string()))
            }
        }
    }
}
