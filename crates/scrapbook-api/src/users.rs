use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{error, info};

use scrapbook_db::models::{ClaimOutcome, UserRow};
use scrapbook_types::api::{
    Claims, ClaimUsernameRequest, ProfileResponse, UserResponse, UsernameAvailability,
};

use crate::error::{ApiError, ApiResult};
use crate::songs::feed_songs;
use crate::state::AppState;

const USERNAME_FORMAT: &str =
    "Username must be 3-20 characters and can only contain letters, numbers, and underscores";

/// Validate a requested username and fold it to its stored (lowercase) form.
pub fn normalize_username(raw: &str) -> Option<String> {
    let valid_len = (3..=20).contains(&raw.len());
    let valid_chars = raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    (valid_len && valid_chars).then(|| raw.to_ascii_lowercase())
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub username: String,
}

/// GET /api/users/check?username
pub async fn check_username(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CheckQuery>, ApiError>,
) -> ApiResult<Json<UsernameAvailability>> {
    let username =
        normalize_username(&query.username).ok_or(ApiError::BadRequest(USERNAME_FORMAT))?;

    let taken = state
        .with_db(move |db| db.username_taken(&username))
        .await
        .map_err(|e| {
            error!("Error checking username: {}", e);
            ApiError::Internal("Failed to check username")
        })?;

    Ok(Json(UsernameAvailability { available: !taken }))
}

/// POST /api/users/claim
///
/// Bind a username to the signed-in account.
pub async fn claim_username(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ClaimUsernameRequest>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    let username =
        normalize_username(&req.username).ok_or(ApiError::BadRequest(USERNAME_FORMAT))?;

    let id = claims.sub.clone();
    let email = claims.email.clone();
    let name = username.clone();
    let outcome = state
        .with_db(move |db| db.claim_username(&id, &email, &name, None))
        .await
        .map_err(|e| {
            error!("Error claiming username: {}", e);
            ApiError::Internal("Failed to claim username")
        })?;

    match outcome {
        ClaimOutcome::Claimed(user) => {
            info!("User {} claimed username {}", claims.sub, username);
            Ok(Json(user_response(user)))
        }
        ClaimOutcome::Taken => Err(ApiError::Conflict("This username is already taken")),
        ClaimOutcome::AlreadyClaimed(_) => {
            Err(ApiError::Conflict("A username has already been claimed"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// GET /api/users/{username}
///
/// A claimed profile and its song-notes.
///
/// Notes are matched by the account's email, so anonymous notes never show
/// up on a profile.
pub async fn get_profile(
    State(state): State<AppState>,
    WithRejection(Path(username), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Query(query), _): WithRejection<Query<ProfileQuery>, ApiError>,
) -> ApiResult<Json<ProfileResponse>> {
    let username = username.to_ascii_lowercase();
    let viewer = query.user_id.filter(|id| !id.is_empty());

    let lookup = username.clone();
    let found = state
        .with_db(move |db| {
            let Some(user) = db.get_user_by_username(&lookup)? else {
                return Ok(None);
            };
            let page = db.songs_by_email(&user.email, viewer.as_deref())?;
            Ok(Some((user, page)))
        })
        .await
        .map_err(|e| {
            error!("Error fetching profile {}: {}", username, e);
            ApiError::Internal("Failed to fetch profile")
        })?;

    let (user, page) = found.ok_or(ApiError::NotFound)?;

    Ok(Json(ProfileResponse {
        username,
        full_name: user.full_name,
        song_count: page.total,
        songs: feed_songs(page),
    }))
}

fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        email: row.email,
        username: row.username,
        full_name: row.full_name,
    }
}
