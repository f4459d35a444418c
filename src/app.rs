//! Application assembly and the server lifecycle.

use crate::analytics::AnalyticsService;
use crate::cache::{ResponseCache, store};
use crate::config::Config;
use crate::github::GitHubApi;
use crate::state::AppState;
use crate::web::create_router;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = store::connect(config.redis_url.as_deref()).await;
        let cache = ResponseCache::new(store);

        let github = GitHubApi::new(&config.github_base_url, config.github_token.as_deref())
            .context("Failed to create GitHub API client")?;
        if config.github_token.is_none() {
            warn!("no GITHUB_TOKEN configured, running with the unauthenticated rate limit");
        }

        let analytics = AnalyticsService::new(Arc::new(github), cache);
        let app_state = AppState::new(analytics);

        Ok(App { config, app_state })
    }

    /// Bind the listener and serve until a shutdown signal arrives, then
    /// give in-flight requests a bounded drain window.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = create_router(self.app_state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(port = self.config.port, "web server listening");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(());

        let drain = Duration::from_secs(self.config.shutdown_timeout);
        match tokio::time::timeout(drain, server).await {
            Ok(result) => result
                .context("server task panicked")?
                .context("web server exited with an error")?,
            Err(_) => warn!(
                timeout_secs = self.config.shutdown_timeout,
                "drain window elapsed with requests still in flight, exiting anyway"
            ),
        }

        info!("shutdown complete");
        Ok(())
    }
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
