//! Dashboard view and OAuth callback landing.
//!
//! `GET /` is the single redirect URI registered with every provider. A load
//! carrying callback parameters is processed and then redirected to the
//! clean URL; any other load returns the dashboard view.

use super::{lookup_session, resolve_session, AppState};
use crate::chat::{session_context, MEMORY_TYPE};
use crate::oauth::{CallbackParams, PlatformRegistry};
use crate::session::{BusinessProfile, ChatMessage, Notice, SessionState};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Session/system status block
#[derive(Serialize, Debug, PartialEq)]
pub struct SystemStatus {
    /// First 8 characters of the session id
    pub session_id: String,
    pub memory: String,
    pub model: String,
}

/// Business profile as rendered (logo base64-encoded)
#[derive(Serialize, Debug, PartialEq)]
pub struct BusinessView {
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_base64: Option<String>,
}

impl From<&BusinessProfile> for BusinessView {
    fn from(profile: &BusinessProfile) -> Self {
        Self {
            name: profile.name.clone(),
            color: profile.color.clone(),
            logo_base64: profile.logo.as_ref().map(|bytes| BASE64.encode(bytes)),
        }
    }
}

/// One connect/disconnect row
#[derive(Serialize, Debug, PartialEq)]
pub struct PlatformView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Everything the dashboard page renders
#[derive(Serialize, Debug)]
pub struct DashboardView {
    pub status: SystemStatus,
    pub business: BusinessView,
    pub platforms: Vec<PlatformView>,
    pub connected_platforms: Vec<String>,
    /// Context line the assistant is (or will be) primed with
    pub context: String,
    pub transcript: Vec<ChatMessage>,
    pub notices: Vec<Notice>,
}

#[derive(Serialize)]
struct PlatformsResponse {
    platforms: Vec<PlatformView>,
}

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/platforms", get(list_platforms))
}

pub(crate) fn platform_views(
    registry: &PlatformRegistry,
    session: &SessionState,
) -> Vec<PlatformView> {
    registry
        .iter()
        .map(|p| {
            let name = p.id.as_str();
            PlatformView {
                name: name.to_string(),
                icon_path: p.icon_path.clone(),
                connected: session.is_connected(name),
                display_name: session.user_profile(name).map(|u| u.display_name()),
            }
        })
        .collect()
}

/// Build the view and drain pending notices
fn build_view(state: &AppState, id: &Uuid, session: &mut SessionState) -> DashboardView {
    let mut session_id = id.to_string();
    session_id.truncate(8);

    DashboardView {
        status: SystemStatus {
            session_id,
            memory: MEMORY_TYPE.to_string(),
            model: state.chat.model().to_string(),
        },
        business: BusinessView::from(session.business_info()),
        platforms: platform_views(state.connector.registry(), session),
        connected_platforms: session
            .connected_platforms()
            .map(|p| p.to_string())
            .collect(),
        context: session_context(session),
        transcript: session.chat_history().to_vec(),
        notices: session.drain_notices(),
    }
}

/// GET /
///
/// Handles the OAuth redirect when callback parameters are present, then
/// redirects to `/` so the consumed code leaves the address bar.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = CallbackParams::from_pairs(pairs);
    let (jar, id, session) = resolve_session(&state, jar);
    let mut session = session.lock().await;

    if params.is_callback() {
        debug!(session = %id, state = ?params.state, "OAuth callback received");
        state.connector.handle_callback(&mut session, &params).await;
        return (jar, Redirect::to("/")).into_response();
    }

    let view = build_view(&state, &id, &mut session);
    (jar, Json(view)).into_response()
}

/// GET /api/platforms
///
/// Without a live session every platform is reported as disconnected.
async fn list_platforms(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let registry = state.connector.registry();

    let platforms = match lookup_session(&state, &jar) {
        Some(session) => {
            let session = session.lock().await;
            platform_views(registry, &session)
        }
        None => platform_views(registry, &SessionState::new()),
    };

    Json(PlatformsResponse { platforms })
}
