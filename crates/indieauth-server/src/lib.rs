//! # indieauth-server
//!
//! A small axum host for the [`indieauth`] engine. It serves the login form,
//! starts logins, verifies callbacks, stores the signed actor in a cookie and
//! gates the instance on the configured allow-list.
//!
//! ## Routes
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET <login_path>` | login form with the h-app block |
//! | `POST <login_path>` | start a login for the submitted `me` |
//! | `GET <login_path>/done` | verify the callback, set the actor cookie |
//! | `GET /` | signed-in actor or the sign-in link |
//! | `GET /-/actor.json` | signed-in actor as JSON |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use indieauth::{HmacSigner, IndieAuthClient};
//! use indieauth_server::{AppState, ServerConfig, app};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! let client = IndieAuthClient::new(config.indieauth.clone(), Arc::new(HmacSigner::generate()?))?;
//! let router = app(AppState::new(client, config)?);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8001").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gate;
pub mod logging;
pub mod render;
pub mod routes;
pub mod state;

pub use config::{ConfigError, LoggingConfig, ServerConfig};
pub use error::ServerError;
pub use gate::CurrentActor;
pub use state::AppState;

use axum::{Router, middleware, routing::get};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build the application router
pub fn app(state: AppState) -> Router {
    let login_path = state.config.login_path.clone();
    let callback_path = state.config.callback_path();
    let timeout = state.config.request_timeout();

    Router::new()
        .route("/", get(routes::index))
        .route("/-/actor.json", get(routes::actor_json))
        .route(&login_path, get(routes::login_form).post(routes::login_submit))
        .route(&callback_path, get(routes::callback))
        .layer(middleware::from_fn_with_state(state.clone(), gate::access_gate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}
