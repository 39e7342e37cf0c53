//! Access gate middleware
//!
//! Resolves the signed-in actor from the session cookie for every request and
//! enforces the `view-instance` decision. A denied request gets the login form
//! with status 403. The login and callback paths are never gated, otherwise a
//! restricted instance could not be signed into.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use indieauth::policy::VIEW_INSTANCE;
use indieauth::{AccessDecision, Actor};
use tracing::debug;

use crate::cookies::{ACTOR_COOKIE, get_cookie_value};
use crate::render::LoginPage;
use crate::state::AppState;

/// The actor behind the current request, inserted into request extensions
#[derive(Debug, Clone, Default)]
pub struct CurrentActor(pub Option<Actor>);

/// Gate every request on the `view-instance` access decision
pub async fn access_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = get_cookie_value(request.headers(), ACTOR_COOKIE)
        .and_then(|cookie| state.client.actor_from_session(&cookie));

    let path = request.uri().path();
    let is_login_path = path == state.config.login_path || path == state.config.callback_path();

    if !is_login_path
        && state.client.access_decision(actor.as_ref(), VIEW_INSTANCE) == AccessDecision::Deny
    {
        debug!(
            "Denied {} for {}",
            path,
            actor.as_ref().map_or("anonymous", |a| a.me.as_str())
        );
        return match state.login_view(request.headers()) {
            Ok(view) => LoginPage(view.forbidden()).into_response(),
            Err(e) => e.into_response(),
        };
    }

    request.extensions_mut().insert(CurrentActor(actor));
    next.run(request).await
}
