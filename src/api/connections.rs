//! Connect/disconnect endpoints.

use super::{resolve_session, AppError, AppState};
use crate::oauth::ConnectorError;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Redirect},
    routing::{delete, get},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response for DELETE /api/connections/:platform
#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    /// False when there was nothing to remove
    pub removed: bool,
}

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/oauth/:platform/start", get(oauth_start))
        .route("/api/connections/:platform", delete(disconnect))
}

/// GET /api/oauth/:platform/start
///
/// Stores a fresh PKCE verifier in the session and redirects the browser to
/// the provider's authorization page.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    debug!(platform = %platform, "OAuth start requested");

    let (jar, id, session) = resolve_session(&state, jar);
    let mut session = session.lock().await;

    let auth_url = state
        .connector
        .initiate(&mut session, &platform)
        .map_err(|e| match e {
            ConnectorError::UnknownPlatform(_) => {
                warn!(platform = %platform, "Invalid platform name");
                AppError::NotFound(format!("Platform '{}' not found", platform))
            }
            other => AppError::BadRequest(other.to_string()),
        })?;

    info!(platform = %platform, session = %id, "Redirecting to OAuth provider");

    Ok((jar, Redirect::temporary(&auth_url)))
}

/// DELETE /api/connections/:platform
///
/// Idempotent: always succeeds, reports whether a connection was removed.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, _, session) = resolve_session(&state, jar);
    let mut session = session.lock().await;

    let removed = state.connector.disconnect(&mut session, &platform);

    (
        jar,
        Json(DisconnectResponse {
            success: true,
            removed,
        }),
    )
}
