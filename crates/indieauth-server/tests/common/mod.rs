//! Shared helpers for router tests
//!
//! The router is driven with `tower::ServiceExt::oneshot`; all outbound HTTP
//! goes to a [`StaticTransport`].

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_TYPE, COOKIE, HOST, SET_COOKIE};
use axum::http::{Request, Response};
use indieauth::discovery::{AUTHORIZATION_ENDPOINT, TOKEN_ENDPOINT};
use indieauth::{
    Actor, ActorSession, AuthState, HmacSigner, IndieAuthClient, PendingLogin, StaticTransport,
    StubResponse,
};
use indieauth_server::{AppState, ServerConfig, app};
use serde_json::Value;
use tower::ServiceExt;

pub const ME: &str = "https://example.test/";
pub const AUTH: &str = "https://auth.example.test/auth";
pub const HOST_NAME: &str = "app.example.test";

/// An application wired to a [`StaticTransport`]
pub struct TestApp {
    pub transport: Arc<StaticTransport>,
    pub signer: Arc<HmacSigner>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let transport = Arc::new(StaticTransport::new());
        let signer = Arc::new(HmacSigner::new(b"router-test-secret"));
        let client = IndieAuthClient::with_transport(
            config.indieauth.clone(),
            signer.clone(),
            transport.clone(),
        );
        let router = app(AppState::new(client, config).unwrap());
        Self {
            transport,
            signer,
            router,
        }
    }

    /// Send a request as a browser at `https://app.example.test`
    pub async fn send(&self, builder: axum::http::request::Builder, body: Body) -> Response<Body> {
        let request = builder
            .header(HOST, HOST_NAME)
            .header("x-forwarded-proto", "https")
            .body(body)
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder, Body::empty()).await
    }

    pub async fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let builder = Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(body)).await
    }

    /// Stub a profile at `me` advertising `authorization_endpoint`
    pub fn stub_profile(&self, me: &str, authorization_endpoint: &str) {
        self.transport.stub_get(
            me,
            StubResponse::html("<p>profile</p>")
                .with_link(authorization_endpoint, AUTHORIZATION_ENDPOINT)
                .with_link("/token", TOKEN_ENDPOINT),
        );
    }

    /// Stub the code exchange at `authorization_endpoint`
    pub fn stub_exchange(&self, authorization_endpoint: &str, body: &Value) {
        self.transport
            .stub_post(authorization_endpoint, StubResponse::json(body));
    }

    /// Signed `state` and pending cookie for a flow started at `me`
    pub fn flow_tokens(&self, authorization_endpoint: &str, me: &str) -> (String, String) {
        let state = AuthState {
            authorization_endpoint: authorization_endpoint.to_string(),
        }
        .seal(self.signer.as_ref())
        .unwrap();
        let cookie = PendingLogin {
            verifier: "a".repeat(64),
            original_me: me.to_string(),
        }
        .seal(self.signer.as_ref())
        .unwrap();
        (state, cookie)
    }

    /// `Cookie` header value for a signed-in `me`
    pub fn session_cookie(&self, me: &str) -> String {
        let token = ActorSession::new(Actor::new(me, None, None))
            .seal(self.signer.as_ref())
            .unwrap();
        format!("indieauth_actor={token}")
    }
}

pub fn callback_uri(state: &str, code: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("state", state)
        .append_pair("code", code)
        .finish();
    format!("/-/indieauth/done?{query}")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value set for cookie `name`, if any `Set-Cookie` header names it
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).iter().find_map(|header| {
        let pair = header.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string())
}
