use crate::error::TransportError;
use crate::{Result, ScanError};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Status codes after which `probe_redirect` reports a `Location`.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// How much of a response body is kept in the raw capture.
pub const RESPONSE_CAPTURE_CHARS: usize = 2000;

/// A completed HTTP response, detached from the client that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    /// Header names are lower-case; order is preserved.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Status line and headers followed by the first 2000 characters of the
    /// body.
    pub fn raw(&self) -> String {
        let mut raw = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str("\r\n");
        raw.extend(self.body.chars().take(RESPONSE_CAPTURE_CHARS));
        raw
    }

    async fn from_response(response: Response) -> Self {
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        // A body that dies mid-stream still leaves status and headers to judge.
        let body = response.text().await.unwrap_or_default();

        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        }
    }
}

/// Request sender used by the scanner. Implementations never follow
/// redirects on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` once.
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> std::result::Result<HttpReply, TransportError>;

    /// HEAD `url` and return its `Location` if the status is a redirect.
    async fn probe_redirect(&self, url: &str) -> Option<String>;
}

/// reqwest-backed transport. One per scan task.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, verify_ssl: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_ssl)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ScanError::Http)?;

        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => debug!("Skipping invalid header {:?}", name),
            }
        }
        map
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> std::result::Result<HttpReply, TransportError> {
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(url)
            .headers(Self::header_map(headers))
            .body(body.to_vec())
            .send()
            .await
            .map_err(TransportError::from)?;

        Ok(HttpReply::from_response(response).await)
    }

    async fn probe_redirect(&self, url: &str) -> Option<String> {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Redirect probe of {} failed: {}", url, e);
                return None;
            }
        };

        if !REDIRECT_STATUSES.contains(&response.status().as_u16()) {
            return None;
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|location| location.to_string())
    }
}
