//! Command line entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use indieauth::{HmacSigner, IndieAuthClient, Signer};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    name = "indieauth-server",
    version,
    about = "Sign in with your own website: an IndieAuth login host",
    long_about = "Serves an IndieAuth login form, verifies callbacks from the user's\n\
                  authorization endpoint and gates the instance on an allow-list.\n\n\
                  Configuration is read from --config (TOML, YAML or JSON) and from\n\
                  INDIEAUTH_* environment variables; flags override both."
)]
pub struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', env = "INDIEAUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Log level or filter directive
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the configuration and apply flag overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file or environment is invalid.
    pub fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::from_env().context("loading configuration from environment")?,
        };
        if let Some(bind) = &self.bind {
            config.bind.clone_from(bind);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        Ok(config)
    }
}

/// Run the server until Ctrl+C
///
/// # Errors
///
/// Returns an error if configuration, logging, the signer or the listener
/// cannot be set up, or if serving fails.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    config.logging.init().context("initialising logging")?;

    let signer: Arc<dyn Signer> = match &config.secret {
        Some(secret) => Arc::new(HmacSigner::new(secret.expose_secret().as_bytes())),
        None => {
            warn!("No secret configured; sessions will not survive a restart");
            Arc::new(HmacSigner::generate()?)
        }
    };

    let timeout = config.request_timeout();
    if timeout.as_secs() > config.request_timeout_secs {
        info!(
            "Request timeout raised from {}s to {}s to cover discovery limits",
            config.request_timeout_secs,
            timeout.as_secs()
        );
    }

    let client = IndieAuthClient::new(config.indieauth.clone(), signer)?;
    let bind = config.bind.clone();
    let state = AppState::new(client, config)?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, crate::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        return std::future::pending().await;
    }
    info!("Shutting down");
}
