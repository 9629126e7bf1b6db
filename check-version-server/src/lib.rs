//! Version check endpoint: tells a client whether a newer release exists and
//! where to download it for its platform.

pub mod release;
pub mod version;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use http_test_util::{ErrorResponse, VersionCheckRequest, VersionCheckResponse, CHECK_VERSION_PATH};
use tracing::debug;

use crate::release::ReleaseInfo;
use crate::version::is_version_latest;

#[derive(Clone)]
pub struct AppState {
    release: Arc<ReleaseInfo>,
}

impl AppState {
    #[must_use]
    pub fn new(release: ReleaseInfo) -> Self {
        Self {
            release: Arc::new(release),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHECK_VERSION_PATH, post(check_version))
        .with_state(state)
}

pub async fn check_version(
    State(state): State<AppState>,
    Json(req): Json<VersionCheckRequest>,
) -> Result<Json<VersionCheckResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.version.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("version is required")),
        ));
    }
    let release = &state.release;
    let need_update = !is_version_latest(&req.version, &release.version);
    debug!(client = %req.version, os_arch = %req.os_arch, need_update, "Version check");
    Ok(Json(VersionCheckResponse {
        version: release.version.clone(),
        update_url: release.update_url_for(&req.os_arch).to_owned(),
        update_log: release.update_log.clone(),
        need_update,
    }))
}
