//! HTTP transport with manual redirect handling and gzip negotiation.
//!
//! All network traffic goes through the [`Transport`] trait. The one
//! required method performs a single HTTP exchange; the provided methods
//! layer same-origin redirect following, response decompression, and
//! status classification on top. Mocks implement the single method and
//! inherit the rest, so tests script individual exchanges.

use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Maximum number of same-origin relative redirects followed per GET.
pub const REDIRECT_LIMIT: u32 = 10;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP method of a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
        }
    }
}

/// One HTTP response as received, before classification.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// URL the response was served from.
    pub url: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns the first header with this name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport settings decided once at startup.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    /// Advertise gzip and decode gzip-encoded response bodies.
    pub gzip: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            gzip: true,
        }
    }
}

/// Trait for HTTP exchanges.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling scripted transports in tests. Implementations are used
/// from one call site at a time and need no internal synchronization.
pub trait Transport {
    /// Performs a single HTTP exchange without following redirects.
    ///
    /// # Arguments
    ///
    /// * `method` - Request method
    /// * `url` - The URL to request
    /// * `headers` - Additional request headers
    /// * `body` - Request body, if any
    ///
    /// # Returns
    ///
    /// The response as received, whatever its status, or an error when no
    /// response arrived at all.
    fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse>;

    /// Whether gzip response encoding is negotiated.
    fn gzip_supported(&self) -> bool {
        true
    }

    /// GET following same-origin relative redirects.
    ///
    /// Follows `302` responses whose `Location` starts with `/`, resolved
    /// against the current URL, for at most [`REDIRECT_LIMIT`] hops;
    /// absolute or missing locations are not followed. Returns the last
    /// response unclassified.
    fn get_response(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let merged = self.merge_headers(headers);
        let mut response = self.request(Method::Get, url, &merged, None)?;
        let mut hops = REDIRECT_LIMIT;
        while response.status == 302 {
            let location = match response.header("location") {
                Some(location) if location.starts_with('/') => location.to_string(),
                _ => break,
            };
            let next = resolve_location(&response.url, &location)?;
            debug!(from = %response.url, to = %next, "following redirect");
            response = self.request(Method::Get, &next, &merged, None)?;
            hops -= 1;
            if hops == 0 {
                break;
            }
        }
        Ok(response)
    }

    /// GET returning the decoded body of a successful response.
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.get_with_headers(url, &[])
    }

    /// GET with additional request headers.
    fn get_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>> {
        let response = self.get_response(url, headers)?;
        read_body(response)
    }

    /// POST returning the decoded body of a successful response. Redirects
    /// are never followed.
    fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<Vec<u8>> {
        let merged = self.merge_headers(headers);
        let response = self.request(Method::Post, url, &merged, Some(body))?;
        read_body(response)
    }

    /// HEAD returning the raw response. Callers inspect status and headers
    /// themselves; redirects are never followed.
    fn head(&self, url: &str) -> Result<HttpResponse> {
        let merged = self.merge_headers(&[]);
        self.request(Method::Head, url, &merged, None)
    }

    #[doc(hidden)]
    fn merge_headers<'a>(&self, headers: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut merged = Vec::with_capacity(headers.len() + 1);
        if self.gzip_supported() {
            merged.push(("accept-encoding", "gzip"));
        }
        merged.extend_from_slice(headers);
        merged
    }
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current).map_err(|e| Error::Network {
        url: current.to_string(),
        reason: e.to_string(),
    })?;
    let next = base.join(location).map_err(|e| Error::Network {
        url: current.to_string(),
        reason: e.to_string(),
    })?;
    Ok(next.into())
}

fn read_body(response: HttpResponse) -> Result<Vec<u8>> {
    if !response.is_success() {
        return Err(Error::Http {
            url: response.url,
            status: response.status,
            reason: response.reason,
        });
    }
    if response.header("content-encoding") == Some("gzip") {
        let mut decoder = GzDecoder::new(response.body.as_slice());
        let mut decoded = Vec::new();
        decoder
            .read_to_end(&mut decoded)
            .map_err(|e| Error::UnexpectedPayload {
                url: response.url.clone(),
                reason: format!("gzip decode failed: {}", e),
            })?;
        Ok(decoded)
    } else {
        Ok(response.body)
    }
}

/// Real transport implementation using reqwest.
///
/// Automatic redirect following is disabled on the client; the policy in
/// [`Transport::get_response`] applies instead. The blocking client pools
/// connections, so files fetched back-to-back during a download reuse one
/// connection per origin.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    gzip: bool,
}

impl ReqwestTransport {
    /// Creates a transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&TransportConfig::default())
    }

    /// Creates a transport with custom configuration.
    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::ClientCreation(e.to_string()))?;
        Ok(Self {
            client,
            gzip: config.gzip,
        })
    }
}

impl Transport for ReqwestTransport {
    fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse> {
        let mut builder = match method {
            Method::Get => self.client.get(url),
            Method::Head => self.client.head(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        debug!(method = method.as_str(), url, "sending request");
        let response = builder.send().map_err(|e| Error::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| Error::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(HttpResponse {
            url: final_url,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }

    fn gzip_supported(&self) -> bool {
        self.gzip
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// One exchange as seen by the mock.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Vec<u8>>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Scripted transport for tests. Responses are consumed in push order
    /// and every exchange is recorded.
    pub struct MockTransport {
        responses: RefCell<VecDeque<Result<HttpResponse>>>,
        requests: RefCell<Vec<RecordedRequest>>,
        gzip: bool,
    }

    impl MockTransport {
        /// A mock that does not negotiate gzip, keeping scripted header
        /// assertions free of the accept-encoding line.
        pub fn new() -> Self {
            Self {
                responses: RefCell::new(VecDeque::new()),
                requests: RefCell::new(Vec::new()),
                gzip: false,
            }
        }

        pub fn with_gzip() -> Self {
            Self {
                gzip: true,
                ..Self::new()
            }
        }

        pub fn push(&self, response: Result<HttpResponse>) {
            self.responses.borrow_mut().push_back(response);
        }

        /// Scripts a 200 response with this body.
        pub fn push_body(&self, body: &[u8]) {
            self.push(Ok(HttpResponse {
                url: String::new(),
                status: 200,
                reason: "OK".to_string(),
                headers: Vec::new(),
                body: body.to_vec(),
            }));
        }

        /// Scripts a bodyless response with this status.
        pub fn push_status(&self, status: u16, reason: &str) {
            self.push(Ok(HttpResponse {
                url: String::new(),
                status,
                reason: reason.to_string(),
                headers: Vec::new(),
                body: Vec::new(),
            }));
        }

        /// Scripts a 302 pointing at `location`.
        pub fn push_redirect(&self, location: &str) {
            self.push(Ok(HttpResponse {
                url: String::new(),
                status: 302,
                reason: "Found".to_string(),
                headers: vec![("location".to_string(), location.to_string())],
                body: Vec::new(),
            }));
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.borrow().clone()
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl Transport for MockTransport {
        fn request(
            &self,
            method: Method,
            url: &str,
            headers: &[(&str, &str)],
            body: Option<&[u8]>,
        ) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(RecordedRequest {
                method,
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                body: body.map(|b| b.to_vec()),
            });
            let mut response = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted response for {} {}", method.as_str(), url))?;
            if response.url.is_empty() {
                response.url = url.to_string();
            }
            Ok(response)
        }

        fn gzip_supported(&self) -> bool {
            self.gzip
        }
    }

    #[test]
    fn test_mock_records_requests() {
        let mock = MockTransport::new();
        mock.push_body(b"abc");
        let body = mock.get("https://example.com/x").unwrap();
        assert_eq!(body, b"abc");
        assert_eq!(mock.requested_urls(), vec!["https://example.com/x"]);
        assert_eq!(mock.requests()[0].method, Method::Get);
    }

    #[test]
    fn test_relative_redirect_followed() {
        let mock = MockTransport::new();
        mock.push_redirect("/new/path");
        mock.push_body(b"hello");

        let body = mock.get("https://example.com/old").unwrap();

        assert_eq!(body, b"hello");
        assert_eq!(
            mock.requested_urls(),
            vec!["https://example.com/old", "https://example.com/new/path"]
        );
    }

    #[test]
    fn test_absolute_redirect_not_followed() {
        let mock = MockTransport::new();
        mock.push(Ok(HttpResponse {
            url: String::new(),
            status: 302,
            reason: "Found".to_string(),
            headers: vec![(
                "location".to_string(),
                "https://other.example.com/x".to_string(),
            )],
            body: Vec::new(),
        }));

        let err = mock.get("https://example.com/a").unwrap_err();

        assert!(matches!(err, Error::Http { status: 302, .. }));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_redirect_without_location_not_followed() {
        let mock = MockTransport::new();
        mock.push_status(302, "Found");

        let err = mock.get("https://example.com/a").unwrap_err();

        assert!(matches!(err, Error::Http { status: 302, .. }));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_redirect_chain_stops_at_limit() {
        let mock = MockTransport::new();
        for i in 0..(REDIRECT_LIMIT + 1) {
            mock.push_redirect(&format!("/hop/{}", i));
        }

        let err = mock.get("https://example.com/start").unwrap_err();

        // One initial request plus REDIRECT_LIMIT follow-ups; the last
        // response is returned as-is and classified like any other.
        assert_eq!(mock.request_count(), (REDIRECT_LIMIT + 1) as usize);
        assert!(matches!(err, Error::Http { status: 302, .. }));
    }

    #[test]
    fn test_gzip_body_decoded() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"payload").unwrap();
        let compressed = encoder.finish().unwrap();

        let mock = MockTransport::with_gzip();
        mock.push(Ok(HttpResponse {
            url: String::new(),
            status: 200,
            reason: "OK".to_string(),
            headers: vec![("content-encoding".to_string(), "gzip".to_string())],
            body: compressed,
        }));

        let body = mock.get("https://example.com/z").unwrap();

        assert_eq!(body, b"payload");
        assert_eq!(mock.requests()[0].header("accept-encoding"), Some("gzip"));
    }

    #[test]
    fn test_gzip_not_advertised_when_unsupported() {
        let mock = MockTransport::new();
        mock.push_body(b"plain");

        mock.get("https://example.com/z").unwrap();

        assert_eq!(mock.requests()[0].header("accept-encoding"), None);
    }

    #[test]
    fn test_non_success_status_classified() {
        let mock = MockTransport::new();
        mock.push_status(404, "Not Found");

        let err = mock.get("https://example.com/missing").unwrap_err();

        match err {
            Error::Http {
                url,
                status,
                reason,
            } => {
                assert_eq!(url, "https://example.com/missing");
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_post_does_not_follow_redirects() {
        let mock = MockTransport::new();
        mock.push_redirect("/elsewhere");

        let err = mock
            .post("https://example.com/query", &[], b"{}")
            .unwrap_err();

        assert!(matches!(err, Error::Http { status: 302, .. }));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_head_returns_raw_response() {
        let mock = MockTransport::new();
        mock.push_redirect("/browse/jquery@3.6.0/");

        let response = mock.head("https://example.com/browse/jquery/").unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(response.header("location"), Some("/browse/jquery@3.6.0/"));
        assert_eq!(mock.requests()[0].method, Method::Head);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            url: "https://example.com".to_string(),
            status: 200,
            reason: "OK".to_string(),
            headers: vec![("Content-Encoding".to_string(), "gzip".to_string())],
            body: Vec::new(),
        };
        assert_eq!(response.header("content-encoding"), Some("gzip"));
        assert_eq!(response.header("CONTENT-ENCODING"), Some("gzip"));
        assert_eq!(response.header("content-type"), None);
    }
}
