//! Profile page fetching and endpoint extraction

use std::sync::Arc;

use http::header;
use tracing::{debug, warn};
use url::Url;

use super::types::{DiscoveryError, DiscoveryResult, RedirectHop, resolve_permanent_redirects};
use super::{AUTHORIZATION_ENDPOINT, TOKEN_ENDPOINT};
use crate::config::DiscoveryConfig;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::link_rel::{parse_link_header, parse_link_rels};

const ACCEPT_HTML: &str = "text/html, application/xhtml+xml;q=0.9, */*;q=0.5";

/// Endpoints found so far in one discovery call
#[derive(Debug, Default)]
struct Endpoints {
    authorization: Option<Url>,
    token: Option<Url>,
}

impl Endpoints {
    fn complete(&self) -> bool {
        self.authorization.is_some() && self.token.is_some()
    }

    /// Record `target` for `rel` unless that endpoint is already known
    fn offer(&mut self, base: &Url, rel_matches: impl Fn(&str) -> bool, target: &str, source: &str) {
        for (name, slot) in [
            (AUTHORIZATION_ENDPOINT, &mut self.authorization),
            (TOKEN_ENDPOINT, &mut self.token),
        ] {
            if slot.is_some() || !rel_matches(name) {
                continue;
            }
            match base.join(target) {
                Ok(url) => {
                    debug!("Found {} in {}: {}", name, source, url);
                    *slot = Some(url);
                }
                Err(e) => warn!("Ignoring unresolvable {} {:?}: {}", name, target, e),
            }
        }
    }
}

/// Endpoint discoverer
///
/// Holds the transport and limits; one instance serves any number of
/// concurrent discoveries.
#[derive(Clone)]
pub struct EndpointDiscoverer {
    transport: Arc<dyn HttpTransport>,
    config: DiscoveryConfig,
}

impl std::fmt::Debug for EndpointDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDiscoverer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EndpointDiscoverer {
    /// Create a discoverer over `transport`
    pub fn new(transport: Arc<dyn HttpTransport>, config: DiscoveryConfig) -> Self {
        Self { transport, config }
    }

    /// Discovery limits in effect
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover the endpoints advertised by `profile_url`
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidUrl`] if `profile_url` (or a redirect
    /// target) is not a valid absolute URL, [`DiscoveryError::TooManyRedirects`]
    /// if the redirect limit is exceeded, and [`DiscoveryError::Transport`] on
    /// network failure or timeout. Transport errors are not retried.
    pub async fn discover(&self, profile_url: &str) -> Result<DiscoveryResult, DiscoveryError> {
        let start = Url::parse(profile_url)
            .map_err(|e| DiscoveryError::InvalidUrl(format!("{profile_url}: {e}")))?;

        let (mut response, history) = self.fetch_following_redirects(&start).await?;
        let canonical_me = resolve_permanent_redirects(&start, &history);
        debug!(
            "Fetched {} after {} redirect(s); canonical profile URL {}",
            response.url,
            history.len(),
            canonical_me
        );

        let base = response.url.clone();
        let mut endpoints = Endpoints::default();

        for value in response.headers.get_all(header::LINK) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for entry in parse_link_header(value) {
                endpoints.offer(&base, |rel| entry.has_rel(rel), &entry.target, "Link header");
            }
        }

        if endpoints.complete() {
            debug!("Both endpoints found in Link headers, skipping body");
        } else {
            let prefix = response.read_prefix(self.config.max_body_prefix).await?;
            let html = String::from_utf8_lossy(&prefix);
            for link in parse_link_rels(&html) {
                if let Some(href) = link.href() {
                    endpoints.offer(&base, |rel| link.has_rel(rel), href, "HTML");
                }
            }
        }

        if endpoints.authorization.is_none() {
            debug!("No {} advertised by {}", AUTHORIZATION_ENDPOINT, canonical_me);
        }

        Ok(DiscoveryResult {
            canonical_me,
            authorization_endpoint: endpoints.authorization,
            token_endpoint: endpoints.token,
        })
    }

    async fn fetch_following_redirects(
        &self,
        start: &Url,
    ) -> Result<(HttpResponse, Vec<RedirectHop>), DiscoveryError> {
        let mut history = Vec::new();
        let mut current = start.clone();

        loop {
            let response = self
                .transport
                .send(HttpRequest::get(current.clone()).with_accept(ACCEPT_HTML))
                .await?;

            let location = match response.location() {
                Some(location) if response.status.is_redirection() => location.to_string(),
                _ => return Ok((response, history)),
            };

            if history.len() >= self.config.max_redirects {
                warn!("Redirect limit {} exceeded fetching {}", self.config.max_redirects, start);
                return Err(DiscoveryError::TooManyRedirects {
                    limit: self.config.max_redirects,
                });
            }

            let hop = RedirectHop {
                url: current.clone(),
                status: response.status,
                location,
            };
            let next = hop.target().ok_or_else(|| {
                DiscoveryError::InvalidUrl(format!("redirect Location {:?} from {current}", hop.location))
            })?;
            debug!("{} {} -> {}", hop.status.as_u16(), current, next);

            history.push(hop);
            current = next;
        }
    }
}
