//! Database row types. These map directly to SQLite rows and are distinct
//! from the scrapbook-types wire models.

use std::collections::HashSet;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub created_at: String,
}

pub struct SongRow {
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
    pub created_at: String,
}

/// Column values for a song-note insert. Id and timestamp are assigned on insert.
pub struct NewSong {
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
}

/// A song-note with its like count.
pub struct FeedRow {
    pub song: SongRow,
    pub likes: u64,
}

/// One snapshot of a song listing: the rows, the size of the whole listing,
/// and which songs the viewer (if any) has liked.
pub struct FeedPage {
    pub rows: Vec<FeedRow>,
    pub total: u64,
    pub liked: HashSet<String>,
}

impl FeedPage {
    pub fn viewer_likes(&self, song_id: &str) -> bool {
        self.liked.contains(song_id)
    }
}

/// Result of a username claim.
pub enum ClaimOutcome {
    Claimed(UserRow),
    /// Another account holds the username.
    Taken,
    /// The account already holds a different username.
    AlreadyClaimed(String),
}
