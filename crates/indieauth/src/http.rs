//! Outbound HTTP transport
//!
//! Discovery and the code exchange never talk to `reqwest` directly; they go
//! through [`HttpTransport`] so that a host can share its own client, and so
//! that tests can run the whole flow against an in-memory transport (see the
//! `test-utils` feature) without a network.
//!
//! Transports never follow redirects. Response bodies are read lazily through
//! [`HttpResponse::read_prefix`], which lets discovery stop after the headers.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderMap};
use http::{Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::DiscoveryConfig;

/// Transport-level failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection, TLS or protocol failure
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// An in-memory test transport has no response registered for the request
    #[cfg(any(test, feature = "test-utils"))]
    #[error("No stubbed response for {method} {url}")]
    NoStub {
        /// Request method
        method: Method,
        /// Request URL
        url: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// `application/x-www-form-urlencoded` body fields, in order; empty for GET
    pub form: Vec<(String, String)>,
    /// Value of the `Accept` header, if any
    pub accept: Option<String>,
}

impl HttpRequest {
    /// A plain GET
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            form: Vec::new(),
            accept: None,
        }
    }

    /// A form-encoded POST
    pub fn post_form<K, V>(url: Url, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::POST,
            url,
            form: form.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            accept: None,
        }
    }

    /// Set the `Accept` header
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

/// A response body that is read on demand
#[async_trait]
pub trait ResponseBody: Send {
    /// Read at most `limit` bytes from the start of the body.
    ///
    /// Repeated calls return the same prefix (extended if `limit` grew).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the body stream fails.
    async fn read_prefix(&mut self, limit: usize) -> Result<Bytes, TransportError>;
}

/// A response whose body has not been read yet
pub struct HttpResponse {
    /// Response status
    pub status: StatusCode,
    /// URL the response was served from
    pub url: Url,
    /// Response headers; repeated headers are preserved
    pub headers: HeaderMap,
    body: Box<dyn ResponseBody>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Assemble a response from its parts
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap, body: Box<dyn ResponseBody>) -> Self {
        Self {
            status,
            url,
            headers,
            body,
        }
    }

    /// Read at most `limit` bytes of the body
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the body stream fails.
    pub async fn read_prefix(&mut self, limit: usize) -> Result<Bytes, TransportError> {
        self.body.read_prefix(limit).await
    }

    /// The `Location` header, if present and valid UTF-8
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION)?.to_str().ok()
    }

    /// Whether the status is a redirect carrying a `Location`
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.location().is_some()
    }
}

/// Something that can send [`HttpRequest`]s
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request without following redirects
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on timeout or connection failure. HTTP
    /// error statuses are not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the configured timeout and user agent and
    /// redirects disabled
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the client cannot be built.
    pub fn new(config: &DiscoveryConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client. The client must not follow redirects.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        if let Some(accept) = &request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        if request.method == Method::POST {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        Ok(HttpResponse::new(
            status,
            url,
            headers,
            Box::new(StreamedBody {
                response: Some(response),
                buffered: BytesMut::new(),
            }),
        ))
    }
}

struct StreamedBody {
    response: Option<reqwest::Response>,
    buffered: BytesMut,
}

#[async_trait]
impl ResponseBody for StreamedBody {
    async fn read_prefix(&mut self, limit: usize) -> Result<Bytes, TransportError> {
        while self.buffered.len() < limit {
            let Some(response) = self.response.as_mut() else {
                break;
            };
            match response.chunk().await? {
                Some(chunk) => self.buffered.extend_from_slice(&chunk),
                None => self.response = None,
            }
        }
        let end = self.buffered.len().min(limit);
        Ok(Bytes::copy_from_slice(&self.buffered[..end]))
    }
}
