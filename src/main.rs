use anyhow::{Context, Result};
use socialai::api::{create_router, AppState};
use socialai::chat::GeminiProviderFactory;
use socialai::config::{load_config, DashboardConfig};
use socialai::oauth::{OAuthConnector, PlatformRegistry};
use socialai::session::SessionStore;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialai=info".into()),
        )
        .init();

    info!("SocialAI dashboard starting...");

    let mut config = match std::env::var("SOCIALAI_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => DashboardConfig::default(),
    };
    config.apply_env_overrides();

    let registry = Arc::new(PlatformRegistry::from_config(&config.platforms)?);
    for platform in registry.iter() {
        if platform.client_id.is_empty() || platform.client_secret.is_empty() {
            warn!(
                platform = %platform.id,
                "OAuth credentials missing; set SOCIALAI_OAUTH_{}_CLIENT_ID and SOCIALAI_OAUTH_{}_CLIENT_SECRET",
                platform.id.as_str().to_uppercase(),
                platform.id.as_str().to_uppercase()
            );
        }
    }
    if config.chat.api_key.is_none() {
        warn!("SOCIALAI_CHAT_API_KEY not set; assistant replies will report an error");
    }

    info!(
        bind_addr = %config.server.bind_addr,
        session_idle_timeout_secs = config.server.session_idle_timeout_secs,
        redirect_uri = %config.oauth.redirect_uri,
        platforms = registry.len(),
        model = %config.chat.model,
        "Configuration loaded"
    );

    let state = AppState {
        sessions: Arc::new(SessionStore::with_idle_timeout(
            config.server.session_idle_timeout(),
        )),
        connector: Arc::new(OAuthConnector::new(
            Arc::clone(&registry),
            config.oauth.redirect_uri.clone(),
        )),
        chat: Arc::new(GeminiProviderFactory::new(config.chat.clone())),
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Dashboard API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("Dashboard API server error")?;

    Ok(())
}
