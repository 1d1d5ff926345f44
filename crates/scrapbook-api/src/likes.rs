use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::{debug, error};

use scrapbook_types::api::{ToggleLikeRequest, ToggleLikeResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/songs/{id}/like
///
/// Flip the caller's like on a song-note.
///
/// `userId` is the client's anonymous correlation id. It is not a credential.
pub async fn toggle_like(
    State(state): State<AppState>,
    WithRejection(Path(song_id), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<ToggleLikeRequest>, ApiError>,
) -> ApiResult<Json<ToggleLikeResponse>> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId is required"));
    }

    let sid = song_id.clone();
    let uid = req.user_id.clone();
    let liked = state
        .with_db(move |db| db.toggle_like(&sid, &uid))
        .await
        .map_err(|e| {
            error!("Error toggling like on {}: {}", song_id, e);
            ApiError::Internal("Failed to toggle like")
        })?
        .ok_or(ApiError::NotFound)?;

    debug!("Song {} liked={} by {}", song_id, liked, req.user_id);
    Ok(Json(ToggleLikeResponse { liked }))
}
