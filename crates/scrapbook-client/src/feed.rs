use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::seq::IndexedRandom;
use tracing::{debug, warn};

use scrapbook_types::api::{CreateSongRequest, FeedSong};
use scrapbook_types::catalog::CatalogTrack;

use crate::api::FeedApi;
use crate::error::ClientError;

/// Decorative tags a new note is randomly painted with.
pub const NOTE_COLORS: &[&str] = &[
    "pink", "blue", "green", "yellow", "orange", "purple", "indigo", "red", "teal",
];

/// Where the feed view is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Loading(u32),
    Loaded(u32),
    AppendLoading(u32),
}

/// The viewer's possibly-stale projection of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    pub songs: Vec<FeedSong>,
    pub has_more: bool,
    pub total: u64,
    pub state: FeedState,
}

impl FeedView {
    fn song_mut(&mut self, song_id: &str) -> Option<&mut FeedSong> {
        self.songs.iter_mut().find(|s| s.song.id == song_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { page: u32, received: usize },
    /// Nothing to load, or a load is already in flight. The trigger is
    /// dropped, not queued.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The server agreed with the optimistic guess.
    Confirmed(bool),
    /// The server disagreed; local state now matches the server.
    Corrected(bool),
    /// The request failed; local state is back to its pre-click value.
    RolledBack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(FeedSong),
    /// A submission is already in flight.
    Skipped,
}

#[derive(Default)]
struct Composer {
    selected: Option<CatalogTrack>,
    submitting: bool,
}

/// Drives one feed view against a [`FeedApi`].
///
/// Share it behind an `Arc`; every method takes `&self`. Locks are only held
/// between awaits, never across them.
pub struct FeedController<A> {
    api: Arc<A>,
    viewer_id: String,
    owner_email: Option<String>,
    view: Mutex<FeedView>,
    composer: Mutex<Composer>,
}

impl<A: FeedApi> FeedController<A> {
    pub fn new(api: Arc<A>, viewer_id: impl Into<String>) -> Self {
        Self {
            api,
            viewer_id: viewer_id.into(),
            owner_email: None,
            view: Mutex::new(FeedView {
                songs: Vec::new(),
                has_more: false,
                total: 0,
                state: FeedState::Idle,
            }),
            composer: Mutex::new(Composer::default()),
        }
    }

    /// Attach submitted notes to a signed-in account so they show on its profile.
    pub fn with_owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = Some(email.into());
        self
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    pub fn snapshot(&self) -> FeedView {
        self.view().clone()
    }

    fn view(&self) -> MutexGuard<'_, FeedView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn composer(&self) -> MutexGuard<'_, Composer> {
        self.composer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Pagination --

    /// Fetch page 1 and replace whatever is in memory.
    pub async fn load_initial(&self) -> Result<LoadOutcome, ClientError> {
        let previous = {
            let mut view = self.view();
            if matches!(view.state, FeedState::Loading(_) | FeedState::AppendLoading(_)) {
                return Ok(LoadOutcome::Skipped);
            }
            let previous = view.state;
            view.state = FeedState::Loading(1);
            previous
        };

        let result = self.api.list_songs(&self.viewer_id, 1).await;

        let mut view = self.view();
        match result {
            Ok(resp) => {
                let received = resp.songs.len();
                view.songs = resp.songs;
                view.has_more = resp.has_more;
                view.total = resp.total;
                view.state = FeedState::Loaded(1);
                Ok(LoadOutcome::Loaded { page: 1, received })
            }
            Err(e) => {
                warn!("Error fetching songs: {}", e);
                view.state = previous;
                Err(e)
            }
        }
    }

    /// Called when the end of the rendered list is reached. Appends the next
    /// page if there is one and no load is already running.
    pub async fn load_more(&self) -> Result<LoadOutcome, ClientError> {
        let (current, next) = {
            let mut view = self.view();
            let FeedState::Loaded(current) = view.state else {
                return Ok(LoadOutcome::Skipped);
            };
            if !view.has_more {
                return Ok(LoadOutcome::Skipped);
            }
            view.state = FeedState::AppendLoading(current + 1);
            (current, current + 1)
        };

        let result = self.api.list_songs(&self.viewer_id, next).await;

        let mut view = self.view();
        match result {
            Ok(resp) => {
                // Notes created since page 1 shift server offsets; skip any
                // song already on screen rather than showing it twice.
                let seen: HashSet<String> = view.songs.iter().map(|s| s.song.id.clone()).collect();
                let fresh: Vec<FeedSong> = resp
                    .songs
                    .into_iter()
                    .filter(|s| !seen.contains(&s.song.id))
                    .collect();
                let received = fresh.len();
                view.songs.extend(fresh);
                view.has_more = resp.has_more;
                view.total = resp.total;
                view.state = FeedState::Loaded(next);
                Ok(LoadOutcome::Loaded { page: next, received })
            }
            Err(e) => {
                warn!("Error fetching page {}: {}", next, e);
                view.state = FeedState::Loaded(current);
                Err(e)
            }
        }
    }

    // -- Likes --

    /// Flip the like immediately, then reconcile with the server's answer.
    pub async fn toggle_like(&self, song_id: &str) -> Result<LikeOutcome, ClientError> {
        let (prior_liked, prior_count, guess) = {
            let mut view = self.view();
            let song = view
                .song_mut(song_id)
                .ok_or_else(|| ClientError::UnknownSong(song_id.to_string()))?;
            let prior = (song.user_likes, song.likes);
            let guess = !song.user_likes;
            song.user_likes = guess;
            song.likes = if guess {
                song.likes + 1
            } else {
                song.likes.saturating_sub(1)
            };
            (prior.0, prior.1, guess)
        };

        let result = self.api.toggle_like(song_id, &self.viewer_id).await;

        match result {
            Ok(liked) if liked == guess => Ok(LikeOutcome::Confirmed(liked)),
            Ok(liked) => {
                debug!("Server disagreed on like for {}: liked={}", song_id, liked);
                if let Some(song) = self.view().song_mut(song_id) {
                    // Server state equals the pre-click state.
                    song.user_likes = liked;
                    song.likes = prior_count;
                }
                Ok(LikeOutcome::Corrected(liked))
            }
            Err(e) => {
                warn!("Error toggling like for {}: {}", song_id, e);
                if let Some(song) = self.view().song_mut(song_id) {
                    song.user_likes = prior_liked;
                    song.likes = prior_count;
                }
                Ok(LikeOutcome::RolledBack)
            }
        }
    }

    // -- Submission --

    /// Step one: pick the catalog track the note is about.
    pub fn select_track(&self, track: CatalogTrack) {
        self.composer().selected = Some(track);
    }

    pub fn selected_track(&self) -> Option<CatalogTrack> {
        self.composer().selected.clone()
    }

    pub fn clear_selection(&self) {
        self.composer().selected = None;
    }

    /// Step two: send the note for the selected track. On success the stored
    /// note is prepended to the feed. On failure the feed and the selection
    /// stay as they were.
    pub async fn submit_note(
        &self,
        note: &str,
        display_name: &str,
    ) -> Result<SubmitOutcome, ClientError> {
        let req = {
            let mut composer = self.composer();
            if composer.submitting {
                return Ok(SubmitOutcome::Skipped);
            }
            let track = composer.selected.as_ref().ok_or(ClientError::NoTrackSelected)?;
            let req = build_request(
                track,
                note,
                display_name,
                &self.viewer_id,
                self.owner_email.as_deref(),
                random_color(),
            );
            composer.submitting = true;
            req
        };

        let result = self.api.create_song(&req).await;

        let mut composer = self.composer();
        composer.submitting = false;
        match result {
            Ok(song) => {
                composer.selected = None;
                drop(composer);

                let entry = FeedSong::unliked(song);
                let mut view = self.view();
                view.songs.insert(0, entry.clone());
                view.total += 1;
                Ok(SubmitOutcome::Submitted(entry))
            }
            Err(e) => {
                warn!("Error saving song: {}", e);
                Err(e)
            }
        }
    }
}

fn random_color() -> &'static str {
    NOTE_COLORS.choose(&mut rand::rng()).copied().unwrap_or("teal")
}

/// Map a catalog track plus the composed text onto the create request.
pub fn build_request(
    track: &CatalogTrack,
    note: &str,
    display_name: &str,
    user_id: &str,
    user_email: Option<&str>,
    color: &str,
) -> CreateSongRequest {
    CreateSongRequest {
        spotify_id: track.id.clone(),
        title: track.name.clone(),
        artist: track.primary_artist().to_string(),
        album: track.album.name.clone(),
        album_cover: track.cover_url().to_string(),
        note: note.to_string(),
        username: display_name.to_string(),
        color: color.to_string(),
        spotify_url: track.catalog_url().to_string(),
        user_id: Some(user_id.to_string()),
        user_email: user_email.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{FakeApi, track};

    fn controller(api: &Arc<FakeApi>) -> FeedController<FakeApi> {
        FeedController::new(api.clone(), "viewer-1")
    }

    #[tokio::test]
    async fn initial_load_fills_page_one() {
        let api = Arc::new(FakeApi::with_songs(10));
        let feed = controller(&api);
        assert_eq!(feed.snapshot().state, FeedState::Idle);

        let outcome = feed.load_initial().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { page: 1, received: 9 });

        let view = feed.snapshot();
        assert_eq!(view.state, FeedState::Loaded(1));
        assert_eq!(view.songs.len(), 9);
        assert!(view.has_more);
        assert_eq!(view.total, 10);
    }

    #[tokio::test]
    async fn load_more_appends_until_exhausted() {
        let api = Arc::new(FakeApi::with_songs(10));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();

        let outcome = feed.load_more().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { page: 2, received: 1 });
        let view = feed.snapshot();
        assert_eq!(view.songs.len(), 10);
        assert!(!view.has_more);
        assert_eq!(view.state, FeedState::Loaded(2));

        assert_eq!(feed.load_more().await.unwrap(), LoadOutcome::Skipped);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_more_before_initial_is_skipped() {
        let api = Arc::new(FakeApi::with_songs(3));
        let feed = controller(&api);
        assert_eq!(feed.load_more().await.unwrap(), LoadOutcome::Skipped);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_load_more_is_dropped_not_queued() {
        let api = Arc::new(FakeApi::with_songs(30).slow());
        let feed = controller(&api);
        feed.load_initial().await.unwrap();

        let (a, b, c) = tokio::join!(feed.load_more(), feed.load_more(), feed.load_more());
        let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];
        let loaded = outcomes
            .iter()
            .filter(|o| matches!(o, LoadOutcome::Loaded { .. }))
            .count();
        assert_eq!(loaded, 1);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(feed.snapshot().songs.len(), 18);
    }

    #[tokio::test]
    async fn failed_append_keeps_current_page() {
        let api = Arc::new(FakeApi::with_songs(12));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();

        api.fail_list.store(true, Ordering::SeqCst);
        assert!(feed.load_more().await.is_err());
        let view = feed.snapshot();
        assert_eq!(view.state, FeedState::Loaded(1));
        assert_eq!(view.songs.len(), 9);

        api.fail_list.store(false, Ordering::SeqCst);
        assert!(matches!(feed.load_more().await.unwrap(), LoadOutcome::Loaded { page: 2, .. }));
    }

    #[tokio::test]
    async fn like_is_optimistic_and_confirmed() {
        let api = Arc::new(FakeApi::with_songs(1));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();
        let id = feed.snapshot().songs[0].song.id.clone();

        assert_eq!(feed.toggle_like(&id).await.unwrap(), LikeOutcome::Confirmed(true));
        let song = &feed.snapshot().songs[0];
        assert!(song.user_likes);
        assert_eq!(song.likes, 1);

        assert_eq!(feed.toggle_like(&id).await.unwrap(), LikeOutcome::Confirmed(false));
        let song = &feed.snapshot().songs[0];
        assert!(!song.user_likes);
        assert_eq!(song.likes, 0);
    }

    #[tokio::test]
    async fn like_is_corrected_when_server_disagrees() {
        let api = Arc::new(FakeApi::with_songs(1));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();
        let id = feed.snapshot().songs[0].song.id.clone();

        // Liked from another tab: the server already has the row, our view doesn't.
        api.likes
            .lock()
            .unwrap()
            .insert((id.clone(), "viewer-1".to_string()));

        assert_eq!(feed.toggle_like(&id).await.unwrap(), LikeOutcome::Corrected(false));
        let song = &feed.snapshot().songs[0];
        assert!(!song.user_likes);
        assert_eq!(song.likes, 0);
    }

    #[tokio::test]
    async fn like_rolls_back_on_failure() {
        let api = Arc::new(FakeApi::with_songs(1));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();
        let id = feed.snapshot().songs[0].song.id.clone();

        api.fail_toggle.store(true, Ordering::SeqCst);
        assert_eq!(feed.toggle_like(&id).await.unwrap(), LikeOutcome::RolledBack);
        let song = &feed.snapshot().songs[0];
        assert!(!song.user_likes);
        assert_eq!(song.likes, 0);
    }

    #[tokio::test]
    async fn like_on_unknown_song_errors() {
        let api = Arc::new(FakeApi::with_songs(0));
        let feed = controller(&api);
        assert!(matches!(
            feed.toggle_like("ghost").await,
            Err(ClientError::UnknownSong(_))
        ));
    }

    #[tokio::test]
    async fn submit_requires_a_selected_track() {
        let api = Arc::new(FakeApi::with_songs(0));
        let feed = controller(&api);
        assert!(matches!(
            feed.submit_note("hello", "me").await,
            Err(ClientError::NoTrackSelected)
        ));
    }

    #[tokio::test]
    async fn submit_prepends_and_bumps_total() {
        let api = Arc::new(FakeApi::with_songs(2));
        let feed = controller(&api).with_owner_email("a@example.com");
        feed.load_initial().await.unwrap();

        feed.select_track(track("T1", "Hello"));
        let SubmitOutcome::Submitted(entry) = feed.submit_note("hello", "Ada").await.unwrap() else {
            panic!("expected submission");
        };
        assert_eq!(entry.song.spotify_id, "T1");
        assert_eq!(entry.song.note, "hello");
        assert_eq!(entry.song.user_email.as_deref(), Some("a@example.com"));
        assert_eq!(entry.likes, 0);
        assert!(NOTE_COLORS.contains(&entry.song.color.as_str()));

        let view = feed.snapshot();
        assert_eq!(view.songs[0], entry);
        assert_eq!(view.total, 3);
        assert!(feed.selected_track().is_none());
    }

    #[tokio::test]
    async fn failed_submit_leaves_feed_and_selection() {
        let api = Arc::new(FakeApi::with_songs(2));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();
        let before = feed.snapshot();

        api.fail_create.store(true, Ordering::SeqCst);
        feed.select_track(track("T1", "Hello"));
        assert!(feed.submit_note("hello", "Ada").await.is_err());

        assert_eq!(feed.snapshot(), before);
        assert!(feed.selected_track().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn double_submit_is_dropped() {
        let api = Arc::new(FakeApi::with_songs(0).slow());
        let feed = controller(&api);
        feed.select_track(track("T1", "Hello"));

        let (a, b) = tokio::join!(feed.submit_note("one", "Ada"), feed.submit_note("two", "Ada"));
        assert!(matches!(a.unwrap(), SubmitOutcome::Submitted(_)));
        assert_eq!(b.unwrap(), SubmitOutcome::Skipped);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn append_skips_songs_already_shown() {
        let api = Arc::new(FakeApi::with_songs(10));
        let feed = controller(&api);
        feed.load_initial().await.unwrap();

        // A note created elsewhere pushes the oldest page-1 song onto page 2.
        api.push_song("late");
        feed.load_more().await.unwrap();

        let view = feed.snapshot();
        let ids: HashSet<&str> = view.songs.iter().map(|s| s.song.id.as_str()).collect();
        assert_eq!(ids.len(), view.songs.len());
        assert_eq!(view.total, 11);
    }

    #[test]
    fn request_uses_track_fields() {
        let req = build_request(&track("T9", "Song"), "note", "Ada", "anon-1", None, "red");
        assert_eq!(req.spotify_id, "T9");
        assert_eq!(req.title, "Song");
        assert_eq!(req.artist, "Artist");
        assert_eq!(req.album_cover, "/placeholder.svg");
        assert_eq!(req.user_id.as_deref(), Some("anon-1"));
        assert_eq!(req.color, "red");
    }
}
