//! Login, callback and instance handlers

use axum::extract::{Extension, Form, Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum::response::{AppendHeaders, Html, IntoResponse, Response};
use html_escape::{encode_double_quoted_attribute, encode_text};
use indieauth::CallbackParams;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::cookies::{
    ACTOR_COOKIE, ACTOR_MAX_AGE, PENDING_COOKIE, PENDING_MAX_AGE, clear_cookie, get_cookie_value,
    set_cookie,
};
use crate::error::ServerError;
use crate::gate::CurrentActor;
use crate::render::LoginPage;
use crate::state::AppState;

/// Login form submission
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    /// The identifier the user typed
    #[serde(default)]
    pub me: String,
}

/// Query parameters of the redirect back from the authorization endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    state: String,
    #[serde(default)]
    code: String,
}

/// `GET <login_path>`
pub async fn login_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<LoginPage, ServerError> {
    Ok(LoginPage(state.login_view(&headers)?))
}

/// `POST <login_path>`: start a login for the submitted identifier
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ServerError> {
    let urls = state.client_urls(&headers)?;
    let view = state.login_view(&headers)?;

    match state.client.begin(&form.me, &urls).await {
        Ok(start) => {
            let cookie = set_cookie(
                PENDING_COOKIE,
                &start.pending_cookie,
                PENDING_MAX_AGE,
                state.secure_cookies(&headers),
            );
            Ok((
                StatusCode::FOUND,
                [(LOCATION, start.redirect.url.to_string()), (SET_COOKIE, cookie)],
            )
                .into_response())
        }
        Err(e) => {
            if e.user_message().is_none() {
                warn!("Login could not start: {}", e);
            }
            Ok(LoginPage(view.for_error(&e)).into_response())
        }
    }
}

/// `GET <login_path>/done`: verify the callback and sign the actor in
///
/// The pending-login cookie is cleared whatever the outcome; the actor cookie
/// is set only on success.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ServerError> {
    let urls = state.client_urls(&headers)?;
    let view = state.login_view(&headers)?;
    let params = CallbackParams::new(
        query.state,
        query.code,
        get_cookie_value(&headers, PENDING_COOKIE),
    );
    let clear_pending = clear_cookie(PENDING_COOKIE);

    match state.client.complete(params, &urls).await {
        Ok(done) => {
            let session = set_cookie(
                ACTOR_COOKIE,
                &done.session_cookie,
                ACTOR_MAX_AGE,
                state.secure_cookies(&headers),
            );
            Ok((
                StatusCode::FOUND,
                [(LOCATION, "/".to_string())],
                AppendHeaders([(SET_COOKIE, clear_pending), (SET_COOKIE, session)]),
            )
                .into_response())
        }
        Err(e) => Ok((
            [(SET_COOKIE, clear_pending)],
            LoginPage(view.for_error(&e)),
        )
            .into_response()),
    }
}

/// `GET /`: who is signed in, or the sign-in link
pub async fn index(
    State(state): State<AppState>,
    Extension(CurrentActor(actor)): Extension<CurrentActor>,
) -> Html<String> {
    let title = encode_text(&state.config.title);
    let body = match (&actor, state.client.menu_entry(actor.as_ref(), &state.config.login_path)) {
        (Some(actor), _) => format!("<p>Signed in as {}</p>", encode_text(&actor.display)),
        (None, Some(link)) => format!(
            "<p><a href=\"{}\">{}</a></p>",
            encode_double_quoted_attribute(&link.href),
            encode_text(&link.label)
        ),
        (None, None) => String::new(),
    };

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    ))
}

/// `GET /-/actor.json`: the signed-in actor, or `null`
pub async fn actor_json(
    Extension(CurrentActor(actor)): Extension<CurrentActor>,
) -> Json<serde_json::Value> {
    Json(json!({ "actor": actor }))
}
