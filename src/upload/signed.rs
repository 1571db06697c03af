//! Primary upload path: encrypted handshake for a pre-signed storage URL,
//! then a direct PUT of the asset bytes.

use chrono::Utc;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

use super::UploadError;
use super::cipher::HandshakeCipher;
use super::data_uri::DataUri;
use crate::upstream::{Session, UpstreamClient, UpstreamError};

const HANDSHAKE_PATH: &str = "/id_photo/s";

/// Metadata announced to the upstream before it signs an upload URL.
#[derive(Debug, Serialize)]
struct UploadTicket<'a> {
    length: usize,
    filetype: &'a str,
    filename: String,
    time: i64,
}

pub struct SignedUploader {
    client: UpstreamClient,
    cipher: HandshakeCipher,
}

impl SignedUploader {
    pub fn new(client: UpstreamClient, cipher: HandshakeCipher) -> Self {
        Self { client, cipher }
    }

    /// Upload `asset` and return its retrievable URL (the signed URL without
    /// its query string).
    pub async fn upload(&self, asset: &DataUri, session: &Session) -> Result<String, UploadError> {
        let signed_url = self.request_upload_url(asset, session).await?;

        let response = self
            .client
            .http()
            .put(&signed_url)
            .header(CONTENT_TYPE, &asset.mime)
            .body(asset.bytes.clone())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::PutRejected {
                status: status.as_u16(),
            });
        }

        let hosted = strip_query(&signed_url)?;
        tracing::debug!(url = %hosted, bytes = asset.bytes.len(), "Signed upload stored");
        Ok(hosted)
    }

    async fn request_upload_url(
        &self,
        asset: &DataUri,
        session: &Session,
    ) -> Result<String, UploadError> {
        let ticket = UploadTicket {
            length: asset.bytes.len(),
            filetype: &asset.mime,
            filename: format!("{}.{}", uuid::Uuid::new_v4().simple(), asset.extension()),
            time: Utc::now().timestamp(),
        };
        let plaintext = serde_json::to_string(&ticket)
            .map_err(|e| UploadError::Cipher(format!("ticket encoding: {e}")))?;
        let token = self.cipher.seal(&plaintext)?;

        let envelope = self
            .client
            .post(HANDSHAKE_PATH, &serde_json::json!({ "t": token }), session)
            .await?;
        let sealed_url = envelope
            .result
            .as_ref()
            .and_then(Value::as_str)
            .ok_or(UpstreamError::MissingField("result"))?;

        self.cipher.open(sealed_url)
    }
}

fn strip_query(signed_url: &str) -> Result<String, UploadError> {
    let mut url = Url::parse(signed_url)
        .map_err(|e| UploadError::InvalidUrl(format!("{signed_url}: {e}")))?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    const SECRET: &str = "test-secret";

    fn uploader(server: &MockServer) -> SignedUploader {
        let client = UpstreamClient::with_client(
            Client::new(),
            format!("{}/api", server.uri()),
            "https://site.test".into(),
        );
        SignedUploader::new(client, HandshakeCipher::new(SECRET))
    }

    fn session() -> Session {
        Session {
            token: "tok".into(),
            user_id: None,
            cookies: None,
        }
    }

    fn asset() -> DataUri {
        DataUri {
            mime: "image/png".into(),
            bytes: b"\x89PNG-bytes".to_vec(),
        }
    }

    async fn mount_handshake(server: &MockServer, signed_url: String) {
        let cipher = HandshakeCipher::new(SECRET);
        Mock::given(method("POST"))
            .and(path("/api/id_photo/s"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(move |req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                let ticket = cipher.open(body["t"].as_str().unwrap()).unwrap();
                let ticket: Value = serde_json::from_str(&ticket).unwrap();
                assert_eq!(ticket["filetype"], "image/png");
                assert_eq!(ticket["length"], 10);
                assert!(ticket["filename"].as_str().unwrap().ends_with(".png"));

                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "code": 200,
                    "result": cipher.seal(&signed_url).unwrap(),
                }))
            })
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn handshake_then_put() {
        let server = MockServer::start().await;
        let signed = format!("{}/bucket/abc.png?X-Amz-Signature=s%2Fig", server.uri());
        mount_handshake(&server, signed).await;
        Mock::given(method("PUT"))
            .and(path("/bucket/abc.png"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = uploader(&server).upload(&asset(), &session()).await.unwrap();
        assert_eq!(url, format!("{}/bucket/abc.png", server.uri()));
    }

    #[tokio::test]
    async fn rejected_put_is_an_error() {
        let server = MockServer::start().await;
        let signed = format!("{}/bucket/abc.png?sig=1", server.uri());
        mount_handshake(&server, signed).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = uploader(&server).upload(&asset(), &session()).await.unwrap_err();
        assert!(matches!(err, UploadError::PutRejected { status: 403 }));
    }

    #[tokio::test]
    async fn handshake_error_envelope_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/id_photo/s"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 401, "message": "no"})),
            )
            .mount(&server)
            .await;

        let err = uploader(&server).upload(&asset(), &session()).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Handshake(UpstreamError::Envelope { code: 401, .. })
        ));
    }

    #[test]
    fn strip_query_keeps_path() {
        assert_eq!(
            strip_query("https://cdn.test/a/b.png?x=1&y=2#frag").unwrap(),
            "https://cdn.test/a/b.png"
        );
        assert!(strip_query("not a url").is_err());
    }
}
