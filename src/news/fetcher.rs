use std::collections::BTreeMap;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

use crate::util::{validate_url, UrlValidationError};

/// Browser User-Agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connection, TLS, or malformed request headers.
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
}

/// Issues the single page request of a pipeline run.
///
/// There is no retry: one GET either yields the page or an error.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    allow_local: bool,
}

impl Fetcher {
    /// `allow_local` permits loopback/private hosts (test servers).
    pub fn new(timeout: Duration, allow_local: bool) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, timeout, allow_local))
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration, allow_local: bool) -> Self {
        Self {
            client,
            timeout,
            allow_local,
        }
    }

    /// GET `url` with `headers` and return the body as text.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, FetchError> {
        let url = validate_url(url, self.allow_local)?;

        let mut request = self.client.get(url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(url = %url, headers = headers.len(), "Fetching news page");

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout.as_secs()))?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let body = tokio::time::timeout(self.timeout, read_limited_text(response, MAX_PAGE_SIZE))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout.as_secs()))??;

        tracing::info!(url = %url, bytes = body.len(), "Fetched news page");
        Ok(body)
    }
}

async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5), true).unwrap()
    }

    fn ua_headers() -> BTreeMap<String, String> {
        BTreeMap::from([("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())])
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("User-Agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>新闻</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&format!("{}/", server.uri()), &ua_headers())
            .await
            .unwrap();
        assert_eq!(body, "<html>新闻</html>");
    }

    #[tokio::test]
    async fn test_error_status_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&server.uri(), &ua_headers())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_replaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'o', b'k', 0xff]))
            .mount(&server)
            .await;

        let body = fetcher().fetch(&server.uri(), &BTreeMap::new()).await.unwrap();
        assert_eq!(body, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_local_target_refused_without_opt_in() {
        let strict = Fetcher::new(Duration::from_secs(5), false).unwrap();
        let err = strict
            .fetch("http://127.0.0.1:9/", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is closed on test hosts.
        let err = fetcher()
            .fetch("http://127.0.0.1:9/", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let quick = Fetcher::new(Duration::from_millis(200), true).unwrap();
        let err = quick.fetch(&server.uri(), &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
