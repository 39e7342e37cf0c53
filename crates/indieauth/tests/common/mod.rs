//! Common test utilities for integration tests
//!
//! Provides a wiremock-backed "profile site" that can serve pages, Link
//! headers, redirect chains and a code exchange endpoint, plus helpers for
//! building flows on top of [`StaticTransport`].

#![allow(dead_code)]

use std::sync::Arc;

use indieauth::discovery::{AUTHORIZATION_ENDPOINT, TOKEN_ENDPOINT};
use indieauth::{
    AuthState, ClientUrls, DiscoveryConfig, EndpointDiscoverer, HmacSigner, PendingLogin,
    ReqwestTransport, StaticTransport, StubResponse,
};
use serde_json::Value;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// A mock web site serving profile pages and an authorization endpoint
pub struct MockProfileSite {
    pub server: MockServer,
}

impl MockProfileSite {
    /// Start a new mock site
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Absolute URL of `path` on this site
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Serve `template` for GET `page`
    pub async fn mock_page(&self, page: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Serve an HTML page
    pub async fn mock_html(&self, page: &str, html: &str) {
        self.mock_page(
            page,
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .await;
    }

    /// Serve a redirect
    pub async fn mock_redirect(&self, page: &str, status: u16, location: &str) {
        self.mock_page(page, ResponseTemplate::new(status).insert_header("location", location))
            .await;
    }

    /// Serve a profile page advertising `authorization_endpoint` in its HTML
    pub async fn mock_profile(&self, page: &str, authorization_endpoint: &str) {
        self.mock_html(
            page,
            &format!(r#"<html><head><link rel="{AUTHORIZATION_ENDPOINT}" href="{authorization_endpoint}"></head></html>"#),
        )
        .await;
    }

    /// Answer code exchange POSTs to `endpoint` with `body`
    pub async fn mock_exchange(&self, endpoint: &str, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}

/// `Link` header value for one endpoint
pub fn link(target: &str, rel: &str) -> String {
    format!("<{target}>; rel=\"{rel}\"")
}

/// A discoverer over the real reqwest transport
pub fn reqwest_discoverer(config: DiscoveryConfig) -> EndpointDiscoverer {
    let transport = ReqwestTransport::new(&config).expect("client");
    EndpointDiscoverer::new(Arc::new(transport), config)
}

/// Test signer with a fixed secret
pub fn signer() -> Arc<HmacSigner> {
    Arc::new(HmacSigner::new(b"integration-test-secret"))
}

/// Client URLs of an application at `https://app.example.test/`
pub fn client_urls() -> ClientUrls {
    ClientUrls::from_base(&Url::parse("https://app.example.test/").unwrap(), "/-/indieauth").unwrap()
}

/// Stub a profile page advertising `authorization_endpoint`
pub fn stub_profile(transport: &StaticTransport, me: &str, authorization_endpoint: &str) {
    transport.stub_get(
        me,
        StubResponse::html("<p>profile</p>")
            .with_link(authorization_endpoint, AUTHORIZATION_ENDPOINT)
            .with_link("/token", TOKEN_ENDPOINT),
    );
}

/// Stub a JSON code exchange response at `authorization_endpoint`
pub fn stub_exchange(transport: &StaticTransport, authorization_endpoint: &str, body: &Value) {
    transport.stub_post(authorization_endpoint, StubResponse::json(body));
}

/// Signed `state` and pending cookie for a flow that started at `me`
pub fn flow_tokens(signer: &HmacSigner, authorization_endpoint: &str, me: &str) -> (String, String) {
    let state = AuthState {
        authorization_endpoint: authorization_endpoint.to_string(),
    }
    .seal(signer)
    .unwrap();
    let cookie = PendingLogin {
        verifier: "a".repeat(64),
        original_me: me.to_string(),
    }
    .seal(signer)
    .unwrap();
    (state, cookie)
}
