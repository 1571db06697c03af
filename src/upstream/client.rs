use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, COOKIE, HeaderMap,
    HeaderName, HeaderValue, ORIGIN, PRAGMA, REFERER, USER_AGENT,
};
use serde::Serialize;

use super::error::UpstreamError;
use super::session::{Session, collect_cookies};
use super::types::Envelope;
use crate::config::UpstreamConfig;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How much of an unexpected body is kept in error messages.
const SNIPPET_CHARS: usize = 500;

/// JSON-envelope transport for the generation service.
///
/// Every request carries browser-like headers and a fresh synthetic client
/// address so that concurrent jobs do not all look like one caller.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    site_origin: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(
            http,
            config.base_url.clone(),
            config.site_origin.clone(),
        ))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(http: Client, base_url: String, site_origin: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            site_origin: site_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Browser-like headers, synthetic client address, and the session's
    /// credentials when present.
    pub fn identity_headers(&self, session: Option<&Session>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-origin"),
        );
        if let Ok(origin) = HeaderValue::from_str(&self.site_origin) {
            headers.insert(ORIGIN, origin);
        }
        if let Ok(referer) = HeaderValue::from_str(&format!("{}/", self.site_origin)) {
            headers.insert(REFERER, referer);
        }

        let address = random_ipv6();
        if let Ok(value) = HeaderValue::from_str(&address) {
            headers.insert(HeaderName::from_static("x-forwarded-for"), value.clone());
            headers.insert(HeaderName::from_static("x-real-ip"), value);
        }

        if let Some(session) = session {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", session.token)) {
                headers.insert(AUTHORIZATION, value);
            }
            if let Some(value) = session
                .cookies
                .as_deref()
                .and_then(|c| HeaderValue::from_str(c).ok())
            {
                headers.insert(COOKIE, value);
            }
        }
        headers
    }

    /// Acquire an anonymous session via `POST /user/visit`.
    pub async fn visit(&self) -> Result<Session, UpstreamError> {
        tracing::debug!("Requesting anonymous upstream session");
        let response = self
            .http
            .post(self.url("/user/visit"))
            .headers(self.identity_headers(None))
            .body("{}")
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UpstreamError::HttpStatus {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let cookies = collect_cookies(response.headers());
        let envelope = Self::read_envelope(response).await?;
        let session = Session::from_visit(envelope, cookies)?;
        tracing::debug!(
            user_id = session.user_id.as_deref().unwrap_or("-"),
            has_cookies = session.cookies.is_some(),
            "Upstream session acquired"
        );
        Ok(session)
    }

    /// POST a JSON body and return the successful envelope.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        session: &Session,
    ) -> Result<Envelope, UpstreamError> {
        let response = self
            .http
            .post(self.url(path))
            .headers(self.identity_headers(Some(session)))
            .json(body)
            .send()
            .await?;
        Self::read_envelope(response).await?.into_success()
    }

    /// GET with a time-varying `t` parameter so edge caches never answer.
    pub async fn get(&self, path: &str, session: &Session) -> Result<Envelope, UpstreamError> {
        let response = self
            .http
            .get(self.url(path))
            .query(&[("t", Utc::now().timestamp_millis())])
            .headers(self.identity_headers(Some(session)))
            .send()
            .await?;
        Self::read_envelope(response).await?.into_success()
    }

    /// Parse a body into an [`Envelope`] without judging its `code`.
    async fn read_envelope(response: reqwest::Response) -> Result<Envelope, UpstreamError> {
        let status = response.status();
        let text = response.text().await?;

        if looks_like_html(&text) {
            return Err(UpstreamError::Blocked {
                status: status.as_u16(),
            });
        }

        serde_json::from_str::<Envelope>(&text).map_err(|e| {
            if status.is_success() {
                UpstreamError::Malformed(format!("{e}: {}", snippet(&text)))
            } else {
                UpstreamError::HttpStatus {
                    status: status.as_u16(),
                    body: snippet(&text),
                }
            }
        })
    }
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with("<!") || head.get(..5).is_some_and(|h| h.eq_ignore_ascii_case("<html"))
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}

fn random_ipv6() -> String {
    let mut rng = rand::rng();
    (0..8)
        .map(|_| format!("{:04x}", rng.random::<u16>()))
        .collect::<Vec<_>>()
        .join(":")
}
