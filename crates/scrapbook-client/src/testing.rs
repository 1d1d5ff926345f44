use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use scrapbook_types::FEED_PAGE_SIZE;
use scrapbook_types::api::{CreateSongRequest, FeedSong, ListSongsResponse, SongResponse};
use scrapbook_types::catalog::{CatalogAlbum, CatalogArtist, CatalogTrack, ExternalUrls};

use crate::api::FeedApi;
use crate::error::ClientError;

/// In-memory stand-in for the HTTP API.
#[derive(Default)]
pub struct FakeApi {
    /// Oldest first.
    pub songs: Mutex<Vec<SongResponse>>,
    pub likes: Mutex<HashSet<(String, String)>>,
    pub results: Mutex<Vec<CatalogTrack>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_toggle: AtomicBool,
    pub fail_search: AtomicBool,
    delay: Option<Duration>,
}

impl FakeApi {
    pub fn with_songs(n: usize) -> Self {
        let api = Self::default();
        for i in 0..n {
            api.push_song(&format!("song-{}", i));
        }
        api
    }

    /// Every call sleeps before answering.
    pub fn slow(mut self) -> Self {
        self.delay = Some(Duration::from_millis(200));
        self
    }

    pub fn push_song(&self, id: &str) {
        let mut songs = self.songs.lock().unwrap();
        let seq = songs.len() as i64;
        songs.push(song(id, seq));
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn offline() -> ClientError {
    ClientError::Io(std::io::Error::other("offline"))
}

fn song(id: &str, seq: i64) -> SongResponse {
    SongResponse {
        id: id.to_string(),
        spotify_id: format!("track-{}", id),
        title: format!("Title {}", id),
        artist: "Artist".into(),
        album: "Album".into(),
        album_cover: "/placeholder.svg".into(),
        note: "note".into(),
        username: "someone".into(),
        color: "pink".into(),
        spotify_url: String::new(),
        user_id: None,
        user_email: None,
        created_at: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
    }
}

pub fn track(id: &str, name: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![CatalogArtist {
            name: "Artist".into(),
        }],
        album: CatalogAlbum {
            name: "Album".into(),
            images: Vec::new(),
        },
        external_urls: ExternalUrls {
            spotify: Some(format!("https://open.example/track/{}", id)),
        },
    }
}

impl FeedApi for FakeApi {
    async fn list_songs(&self, viewer_id: &str, page: u32) -> Result<ListSongsResponse, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(offline());
        }

        let songs = self.songs.lock().unwrap();
        let likes = self.likes.lock().unwrap();
        let total = songs.len() as u64;
        let offset = ((page - 1) * FEED_PAGE_SIZE) as usize;
        let page_songs = songs
            .iter()
            .rev()
            .skip(offset)
            .take(FEED_PAGE_SIZE as usize)
            .map(|s| FeedSong {
                song: s.clone(),
                likes: likes.iter().filter(|(id, _)| *id == s.id).count() as u64,
                user_likes: likes.contains(&(s.id.clone(), viewer_id.to_string())),
            })
            .collect();

        Ok(ListSongsResponse {
            songs: page_songs,
            has_more: total > u64::from(page * FEED_PAGE_SIZE),
            total,
        })
    }

    async fn create_song(&self, req: &CreateSongRequest) -> Result<SongResponse, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(offline());
        }

        let mut songs = self.songs.lock().unwrap();
        let stored = SongResponse {
            id: format!("created-{}", songs.len()),
            spotify_id: req.spotify_id.clone(),
            title: req.title.clone(),
            artist: req.artist.clone(),
            album: req.album.clone(),
            album_cover: req.album_cover.clone(),
            note: req.note.clone(),
            username: req.username.clone(),
            color: req.color.clone(),
            spotify_url: req.spotify_url.clone(),
            user_id: req.user_id.clone(),
            user_email: req.user_email.clone(),
            created_at: Utc.timestamp_opt(1_800_000_000, 0).unwrap(),
        };
        songs.push(stored.clone());
        Ok(stored)
    }

    async fn toggle_like(&self, song_id: &str, user_id: &str) -> Result<bool, ClientError> {
        self.pause().await;
        if self.fail_toggle.load(Ordering::SeqCst) {
            return Err(offline());
        }

        let key = (song_id.to_string(), user_id.to_string());
        let mut likes = self.likes.lock().unwrap();
        if likes.remove(&key) {
            Ok(false)
        } else {
            likes.insert(key);
            Ok(true)
        }
    }

    async fn search_tracks(&self, _query: &str) -> Result<Vec<CatalogTrack>, ClientError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(self.results.lock().unwrap().clone())
    }
}
