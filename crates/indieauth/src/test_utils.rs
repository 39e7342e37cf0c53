//! In-memory test doubles
//!
//! Available with the `test-utils` feature. [`StaticTransport`] serves canned
//! [`StubResponse`]s instead of touching the network, so a host can drive the
//! whole login flow from its own tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use url::Url;

use crate::http::{HttpRequest, HttpResponse, HttpTransport, ResponseBody, TransportError};

/// A canned response for [`StaticTransport`]
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl StubResponse {
    /// An empty response with the given status
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// `200 OK` with a `text/html` body
    pub fn html(body: impl Into<String>) -> Self {
        Self::status(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .with_body(body.into())
    }

    /// `200 OK` with a JSON body
    pub fn json(value: &serde_json::Value) -> Self {
        Self::status(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, "application/json")
            .with_body(value.to_string())
    }

    /// A redirect to `location`
    pub fn redirect(status: StatusCode, location: &str) -> Self {
        Self::status(status).with_header(header::LOCATION, location)
    }

    /// Append a header; values that are not valid header text are dropped
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Append a `Link` header entry
    pub fn with_link(self, target: &str, rel: &str) -> Self {
        self.with_header(header::LINK, &format!("<{target}>; rel=\"{rel}\""))
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request observed by [`StaticTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Form fields sent with a POST
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Look up a form field by name
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// In-memory [`HttpTransport`] serving registered stubs
///
/// Stubs are keyed by method and URL (after URL normalisation, so
/// `https://Example.com` and `https://example.com/` are the same key).
/// Registering a stub for an existing key replaces it. Every request is
/// recorded, and body reads are counted across all responses.
///
/// ```
/// use http::{Method, StatusCode};
/// use indieauth::test_utils::{StaticTransport, StubResponse};
///
/// let transport = StaticTransport::new();
/// transport.stub(
///     Method::GET,
///     "https://example.test/",
///     StubResponse::status(StatusCode::OK).with_link("/auth", "authorization_endpoint"),
/// );
/// ```
#[derive(Debug, Default)]
pub struct StaticTransport {
    stubs: Mutex<HashMap<(Method, String), StubResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    body_reads: Arc<AtomicUsize>,
}

fn stub_key(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string())
}

impl StaticTransport {
    /// An empty transport; every request fails with [`TransportError::NoStub`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the response for `method url`
    pub fn stub(&self, method: Method, url: &str, response: StubResponse) -> &Self {
        self.stubs.lock().insert((method, stub_key(url)), response);
        self
    }

    /// Register a GET stub
    pub fn stub_get(&self, url: &str, response: StubResponse) -> &Self {
        self.stub(Method::GET, url, response)
    }

    /// Register a POST stub
    pub fn stub_post(&self, url: &str, response: StubResponse) -> &Self {
        self.stub(Method::POST, url, response)
    }

    /// All requests sent so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests sent with the given method
    pub fn requests_with_method(&self, method: &Method) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| &r.method == method)
            .cloned()
            .collect()
    }

    /// Number of times any response body was read
    pub fn body_reads(&self) -> usize {
        self.body_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(RecordedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            form: request.form.clone(),
        });

        let key = (request.method.clone(), stub_key(request.url.as_str()));
        let Some(stub) = self.stubs.lock().get(&key).cloned() else {
            return Err(TransportError::NoStub {
                method: request.method,
                url: request.url.to_string(),
            });
        };

        Ok(HttpResponse::new(
            stub.status,
            request.url,
            stub.headers,
            Box::new(StaticBody {
                body: stub.body,
                reads: Arc::clone(&self.body_reads),
            }),
        ))
    }
}

struct StaticBody {
    body: Bytes,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl ResponseBody for StaticBody {
    async fn read_prefix(&mut self, limit: usize) -> Result<Bytes, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.slice(..self.body.len().min(limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_static_transport_serves_and_records() {
        let transport = StaticTransport::new();
        transport.stub_get("https://Example.test", StubResponse::html("<p>hi</p>"));

        let mut response = transport
            .send(HttpRequest::get(url("https://example.test/")))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.body_reads(), 0);

        let prefix = response.read_prefix(3).await.unwrap();
        assert_eq!(&prefix[..], b"<p>");
        assert_eq!(transport.body_reads(), 1);

        let recorded = transport.requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_static_transport_missing_stub() {
        let transport = StaticTransport::new();
        let err = transport
            .send(HttpRequest::post_form(url("https://auth.test/"), [("code", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NoStub { .. }));
        assert_eq!(transport.requests()[0].form_value("code"), Some("x"));
    }

    #[tokio::test]
    async fn test_stub_replacement() {
        let transport = StaticTransport::new();
        transport.stub_get("https://a.test/", StubResponse::status(StatusCode::NOT_FOUND));
        transport.stub_get("https://a.test/", StubResponse::status(StatusCode::OK));
        let response = transport.send(HttpRequest::get(url("https://a.test/"))).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn test_stub_headers_repeat() {
        let stub = StubResponse::status(StatusCode::OK)
            .with_link("/a", "authorization_endpoint")
            .with_link("/t", "token_endpoint");
        assert_eq!(stub.headers.get_all(header::LINK).iter().count(), 2);
    }

    #[test]
    fn test_redirect_helper() {
        let stub = StubResponse::redirect(StatusCode::MOVED_PERMANENTLY, "/one");
        let response = HttpResponse::new(
            stub.status,
            url("https://a.test/"),
            stub.headers,
            Box::new(StaticBody {
                body: Bytes::new(),
                reads: Arc::new(AtomicUsize::new(0)),
            }),
        );
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/one"));
    }
}
