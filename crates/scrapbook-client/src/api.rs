use std::future::Future;

use scrapbook_types::api::{
    CreateSongRequest, ListSongsResponse, SongResponse, ToggleLikeRequest, ToggleLikeResponse,
};
use scrapbook_types::catalog::{CatalogTrack, SearchResponse};

use crate::error::ClientError;

/// The server operations the feed controller depends on.
pub trait FeedApi: Send + Sync {
    fn list_songs(
        &self,
        viewer_id: &str,
        page: u32,
    ) -> impl Future<Output = Result<ListSongsResponse, ClientError>> + Send;

    fn create_song(
        &self,
        req: &CreateSongRequest,
    ) -> impl Future<Output = Result<SongResponse, ClientError>> + Send;

    /// Returns the server's authoritative "liked" state after the toggle.
    fn toggle_like(
        &self,
        song_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    fn search_tracks(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<CatalogTrack>, ClientError>> + Send;
}

/// `FeedApi` over the scrapbook's HTTP endpoints.
#[derive(Clone)]
pub struct HttpFeedApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFeedApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl FeedApi for HttpFeedApi {
    async fn list_songs(&self, viewer_id: &str, page: u32) -> Result<ListSongsResponse, ClientError> {
        let page = page.to_string();
        let resp = self
            .http
            .get(self.url("/api/songs"))
            .query(&[("userId", viewer_id), ("page", page.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    async fn create_song(&self, req: &CreateSongRequest) -> Result<SongResponse, ClientError> {
        let song = self
            .http
            .post(self.url("/api/songs"))
            .json(req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(song)
    }

    async fn toggle_like(&self, song_id: &str, user_id: &str) -> Result<bool, ClientError> {
        let resp: ToggleLikeResponse = self
            .http
            .post(self.url(&format!("/api/songs/{}/like", song_id)))
            .json(&ToggleLikeRequest {
                user_id: user_id.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.liked)
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<CatalogTrack>, ClientError> {
        let resp: SearchResponse = self
            .http
            .get(self.url("/api/spotify/search"))
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.tracks.items)
    }
}
