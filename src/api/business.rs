//! Business profile endpoint.

use super::{resolve_session, AppError, AppState, BusinessView};
use crate::session::{BusinessProfile, NoticeLevel};
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::put,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Request body for PUT /api/business
#[derive(Deserialize, Debug)]
pub struct SaveBusinessRequest {
    #[serde(default)]
    pub name: String,
    /// Base64-encoded PNG/JPEG; omitting it clears the logo
    #[serde(default)]
    pub logo_base64: Option<String>,
    pub color: String,
}

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/business", put(save_business))
}

/// Check `#RRGGBB`
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate a save request and turn it into a profile
pub fn parse_business_request(req: SaveBusinessRequest) -> Result<BusinessProfile, AppError> {
    if !is_hex_color(&req.color) {
        return Err(AppError::BadRequest(format!(
            "Invalid color '{}' (expected #RRGGBB)",
            req.color
        )));
    }

    let logo = req
        .logo_base64
        .filter(|s| !s.is_empty())
        .map(|encoded| {
            BASE64
                .decode(encoded.trim())
                .map_err(|e| AppError::BadRequest(format!("Invalid logo encoding: {}", e)))
        })
        .transpose()?;

    Ok(BusinessProfile {
        name: req.name.trim().to_string(),
        logo,
        color: req.color,
    })
}

/// PUT /api/business
///
/// Replaces the business profile and invalidates the assistant context.
async fn save_business(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SaveBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = parse_business_request(req)?;

    let (jar, id, session) = resolve_session(&state, jar);
    let mut session = session.lock().await;

    info!(
        session = %id,
        has_logo = profile.logo.is_some(),
        "Business profile saved"
    );
    session.set_business_info(profile);
    session.push_notice(NoticeLevel::Success, "Business profile saved!");

    Ok((jar, Json(BusinessView::from(session.business_info()))))
}
