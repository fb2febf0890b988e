//! HTTP transport backed by `reqwest`.
//!
//! This module provides the production [`Transport`]:
//! - Paths are joined onto a configured base URL
//! - Every request carries JSON `Content-Type` and `Accept` headers
//! - Request/response tracing
//! - Timeouts surface as [`TransportError::Timeout`]

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::TransportError;
use crate::transport::{RawResponse, Transport};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for TrackMe.
const USER_AGENT: &str = concat!("trackme/", env!("CARGO_PKG_VERSION"));

/// JSON media type used for both request and accepted response bodies.
const APPLICATION_JSON: &str = "application/json";

// ============================================================================
// HTTP Transport
// ============================================================================

/// `reqwest`-based transport for the reporting server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport for `base_url` with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            inner: client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Returns the base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the absolute URL for an endpoint path.
    ///
    /// The base URL's own path is kept, so `http://host/api` + `/auth`
    /// becomes `http://host/api/auth`.
    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(base = %self.base_url, body_len = body.len()))]
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<RawResponse, TransportError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST request with JSON");

        let response = self
            .inner
            .post(url)
            .header(header::CONTENT_TYPE, APPLICATION_JSON)
            .header(header::ACCEPT, APPLICATION_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "POST failed without a response");
                self.map_error(e)
            })?;

        let status = response.status().as_u16();
        debug!(status, "Response received");

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the request head, and answers with
    /// the given status line and body.
    async fn serve_once(listener: TcpListener, status_line: &'static str, body: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut received = Vec::new();
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if received.len() >= head_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&received).to_string()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let transport = HttpTransport::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(
            transport.endpoint("/coordinates").unwrap().as_str(),
            "http://127.0.0.1:5000/coordinates"
        );

        let prefixed = HttpTransport::new("https://example.com/api").unwrap();
        assert_eq!(
            prefixed.endpoint("/auth").unwrap().as_str(),
            "https://example.com/api/auth"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpTransport::new("ftp://example.com"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_post_sends_json_headers_and_returns_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "401 Unauthorized", "{}"));

        let transport = HttpTransport::new(&format!("http://{addr}")).unwrap();
        let response = transport
            .post("/coordinates", br#"{"username":"alice"}"#.to_vec())
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body, b"{}");

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /coordinates http/1.1"));
        assert!(request.contains("content-type: application/json"));
        assert!(request.contains("accept: application/json"));
        assert!(request.ends_with(r#"{"username":"alice"}"#));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::with_timeout(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let result = transport.post("/auth", b"{}".to_vec()).await;
        assert!(matches!(
            result,
            Err(TransportError::Network(_) | TransportError::Timeout(_))
        ));
    }
}
