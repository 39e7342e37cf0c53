//! Shared application state

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::HOST;
use indieauth::{ClientUrls, IndieAuthClient, LoginView};
use url::Url;

use crate::config::{ConfigError, ServerConfig};
use crate::error::ServerError;

/// State shared by every handler and the access gate
#[derive(Debug, Clone)]
pub struct AppState {
    /// The IndieAuth engine
    pub client: Arc<IndieAuthClient>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    public_url: Option<Url>,
}

impl AppState {
    /// Build the state, parsing the configured public URL once
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `public_url` is unusable.
    pub fn new(client: IndieAuthClient, config: ServerConfig) -> Result<Self, ConfigError> {
        let public_url = config.public_base_url()?;
        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            public_url,
        })
    }

    /// Absolute base URL of this instance, as seen by the browser
    ///
    /// `public_url` wins; otherwise the request's `Host` header is used with
    /// the scheme from `X-Forwarded-Proto` (default `http`).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownHost`] when neither source yields a URL.
    pub fn base_url(&self, headers: &HeaderMap) -> Result<Url, ServerError> {
        if let Some(url) = &self.public_url {
            return Ok(url.clone());
        }

        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty() && !h.contains(['/', '@', '?', '#']))
            .ok_or(ServerError::UnknownHost)?;
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|p| matches!(*p, "http" | "https"))
            .unwrap_or("http");

        Url::parse(&format!("{scheme}://{host}/")).map_err(|_| ServerError::UnknownHost)
    }

    /// Client identifier and redirect URI for this request
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be determined or joined with
    /// the login path.
    pub fn client_urls(&self, headers: &HeaderMap) -> Result<ClientUrls, ServerError> {
        let base = self.base_url(headers)?;
        Ok(ClientUrls::from_base(&base, &self.config.login_path)?)
    }

    /// A blank login form for this request
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownHost`] when the base URL is unknown.
    pub fn login_view(&self, headers: &HeaderMap) -> Result<LoginView, ServerError> {
        let base = self.base_url(headers)?;
        Ok(LoginView::form(
            self.config.title.clone(),
            base.to_string(),
            self.config.login_path.clone(),
        ))
    }

    /// Whether cookies for this request should carry `Secure`
    pub fn secure_cookies(&self, headers: &HeaderMap) -> bool {
        self.base_url(headers)
            .map(|url| url.scheme() == "https")
            .unwrap_or(false)
    }
}
