use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use scrapbook_db::models::{FeedPage, NewSong, SongRow};
use scrapbook_types::FEED_PAGE_SIZE;
use scrapbook_types::api::{CreateSongRequest, FeedSong, ListSongsResponse, SongResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSongsQuery {
    /// Viewer whose likes annotate the page. Optional; anonymous browsing is fine.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// GET /api/songs?userId&page
///
/// One page of the feed, newest first.
pub async fn list_songs(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListSongsQuery>, ApiError>,
) -> ApiResult<Json<ListSongsResponse>> {
    if query.page == 0 {
        return Err(ApiError::BadRequest("page must be at least 1"));
    }
    let offset = (query.page - 1)
        .checked_mul(FEED_PAGE_SIZE)
        .ok_or(ApiError::BadRequest("page out of range"))?;
    let viewer = query.user_id.filter(|id| !id.is_empty());

    let page = state
        .with_db(move |db| db.feed_page(offset, FEED_PAGE_SIZE, viewer.as_deref()))
        .await
        .map_err(|e| {
            error!("Error fetching songs: {}", e);
            ApiError::Internal("Failed to fetch songs")
        })?;

    let total = page.total;
    let has_more = total > u64::from(query.page) * u64::from(FEED_PAGE_SIZE);

    Ok(Json(ListSongsResponse {
        songs: feed_songs(page),
        has_more,
        total,
    }))
}

/// POST /api/songs
///
/// Store a new song-note and hand back the stored row so
/// the client can prepend it without refetching.
pub async fn create_song(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateSongRequest>, ApiError>,
) -> ApiResult<Json<SongResponse>> {
    let song_id = Uuid::new_v4().to_string();
    let new_song = NewSong {
        spotify_id: req.spotify_id,
        title: req.title,
        artist: req.artist,
        album: req.album,
        album_cover: req.album_cover,
        note: req.note,
        username: req.username,
        color: req.color,
        spotify_url: req.spotify_url,
        user_id: req.user_id,
        user_email: req.user_email,
    };

    let sid = song_id.clone();
    let row = state
        .with_db(move |db| db.insert_song(&sid, &new_song))
        .await
        .map_err(|e| {
            error!("Error saving song: {}", e);
            ApiError::Internal("Failed to save song")
        })?;

    info!("Song {} saved ({} by {})", row.id, row.title, row.artist);
    Ok(Json(song_response(row)))
}

/// Annotate a store page for its viewer.
pub(crate) fn feed_songs(mut page: FeedPage) -> Vec<FeedSong> {
    let rows = std::mem::take(&mut page.rows);
    rows.into_iter()
        .map(|row| {
            let user_likes = page.viewer_likes(&row.song.id);
            FeedSong {
                song: song_response(row.song),
                likes: row.likes,
                user_likes,
            }
        })
        .collect()
}

pub(crate) fn song_response(row: SongRow) -> SongResponse {
    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // Rows written by hand may use SQLite's "YYYY-MM-DD HH:MM:SS" form.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on song '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    SongResponse {
        id: row.id,
        spotify_id: row.spotify_id,
        title: row.title,
        artist: row.artist,
        album: row.album,
        album_cover: row.album_cover,
        note: row.note,
        username: row.username,
        color: row.color,
        spotify_url: row.spotify_url,
        user_id: row.user_id,
        user_email: row.user_email,
        created_at,
    }
}
