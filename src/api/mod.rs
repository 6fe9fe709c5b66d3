// HTTP API for the dashboard

pub mod business;
pub mod chat;
pub mod connections;
pub mod dashboard;

use crate::chat::ChatProviderFactory;
use crate::oauth::OAuthConnector;
use crate::session::{SessionStore, SharedSession};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub use dashboard::{BusinessView, DashboardView, PlatformView, SystemStatus};

/// Cookie carrying the browser session id
pub const SESSION_COOKIE: &str = "socialai_session";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub connector: Arc<OAuthConnector>,
    pub chat: Arc<dyn ChatProviderFactory>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for API endpoints
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Create the full dashboard router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(dashboard::routes())
        .merge(connections::routes())
        .merge(business::routes())
        .merge(chat::routes())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

/// The caller's existing session, if the cookie names a live one.
///
/// Read-only routes use this so a cookieless request does not allocate a
/// session.
pub(crate) fn lookup_session(state: &AppState, jar: &CookieJar) -> Option<SharedSession> {
    session_id(jar).and_then(|id| state.sessions.get(&id))
}

/// Resolve (or start) the caller's session from the cookie jar.
///
/// Returns the jar with the session cookie set so handlers can hand it back
/// in the response.
pub(crate) fn resolve_session(state: &AppState, jar: CookieJar) -> (CookieJar, Uuid, SharedSession) {
    let existing = session_id(&jar);

    let (id, session) = state.sessions.get_or_create(existing);

    let jar = if existing == Some(id) {
        jar
    } else {
        jar.add(
            Cookie::build((SESSION_COOKIE, id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    };

    (jar, id, session)
}
