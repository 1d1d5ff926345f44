//! Proxy to the external music catalog.
//!
//! Every search first trades the long-lived refresh credential for a fresh
//! access token, then forwards the query. Nothing is cached between requests
//! and nothing is retried.

use anyhow::Result;
use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upstream matches returned per search.
pub const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// OAuth token endpoint, e.g. `https://accounts.spotify.com/api/token`.
    pub token_url: String,
    /// Web API base, e.g. `https://api.spotify.com/v1`.
    pub api_base: String,
}

pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn refresh_request(&self) -> reqwest::RequestBuilder {
        self.http.post(&self.config.token_url).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", self.config.refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ])
    }

    /// Run the refresh grant and return the upstream body as-is, whatever
    /// its status.
    pub async fn refresh(&self) -> Result<serde_json::Value> {
        let body = self.refresh_request().send().await?.json().await?;
        Ok(body)
    }

    async fn access_token(&self) -> Result<String> {
        let token: TokenResponse = self
            .refresh_request()
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(token.access_token)
    }

    /// Track search. The upstream payload is passed through untouched.
    pub async fn search_tracks(&self, query: &str) -> Result<serde_json::Value> {
        let token = self.access_token().await?;
        let limit = SEARCH_LIMIT.to_string();

        let body = self
            .http
            .get(format!("{}/search", self.config.api_base.trim_end_matches('/')))
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/spotify/search?q
pub async fn search(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, ApiError>,
) -> ApiResult<Json<serde_json::Value>> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or(ApiError::BadRequest("Query parameter is required"))?;

    debug!("Catalog search: {}", q);
    let body = state.catalog.search_tracks(&q).await.map_err(|e| {
        error!("Failed to search songs: {}", e);
        ApiError::Internal("Failed to search songs")
    })?;

    Ok(Json(body))
}

/// GET /api/spotify/refresh
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let body = state.catalog.refresh().await.map_err(|e| {
        error!("Failed to refresh token: {}", e);
        ApiError::Internal("Failed to refresh token")
    })?;

    Ok(Json(body))
}
