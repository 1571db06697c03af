use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::UploadError;

const DEFAULT_MIME: &str = "image/jpeg";

/// A decoded `data:<mime>;base64,<payload>` asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn parse(input: &str) -> Result<Self, UploadError> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| UploadError::InvalidDataUri("missing `data:` prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| UploadError::InvalidDataUri("missing `,` separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| UploadError::InvalidDataUri("payload is not base64".into()))?;

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| UploadError::InvalidDataUri(format!("bad base64 payload: {e}")))?;
        if bytes.is_empty() {
            return Err(UploadError::InvalidDataUri("empty payload".into()));
        }

        Ok(Self {
            mime: if mime.is_empty() {
                DEFAULT_MIME.to_string()
            } else {
                mime.to_string()
            },
            bytes,
        })
    }

    /// File extension derived from the MIME subtype (`image/png` → `png`).
    pub fn extension(&self) -> &str {
        self.mime
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("jpg")
    }
}
