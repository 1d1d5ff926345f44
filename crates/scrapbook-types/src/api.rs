use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Session --

/// Claims carried by the session token issued after the auth callback.
/// `sub` is the identity provider's opaque user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

// -- Songs --

/// Body of `POST /api/songs`. Field names follow the browser client's camelCase.
///
/// Only the catalog track id is required. Anything else the client leaves out
/// is stored as an empty string, and extra fields (the client sends `likes: 0`)
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    /// Catalog track id.
    #[serde(rename = "id")]
    pub spotify_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_cover: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub spotify_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// A stored song-note, exactly as materialized by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongResponse {
    pub id: String,
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_cover: String,
    pub note: String,
    pub username: String,
    pub color: String,
    pub spotify_url: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A song-note annotated for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSong {
    #[serde(flatten)]
    pub song: SongResponse,
    pub likes: u64,
    pub user_likes: bool,
}

impl FeedSong {
    /// A freshly created note has no likes yet.
    pub fn unliked(song: SongResponse) -> Self {
        Self {
            song,
            likes: 0,
            user_likes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSongsResponse {
    pub songs: Vec<FeedSong>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    pub total: u64,
}

// -- Likes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleLikeRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub liked: bool,
}

// -- Users --

#[derive(Debug, Deserialize, Serialize)]
pub struct ClaimUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsernameAvailability {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    pub full_name: Option<String>,
    pub song_count: u64,
    pub songs: Vec<FeedSong>,
}

// -- Errors --

/// Generic error body. Causes are logged server-side, never returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
