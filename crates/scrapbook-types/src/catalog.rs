//! Subset of the music catalog's track search payload that clients read.
//!
//! The server passes the upstream JSON through untouched; these types only
//! pick out the fields needed to build a song-note.

use serde::{Deserialize, Serialize};

/// Cover shown when the catalog has no album art for a track.
pub const PLACEHOLDER_COVER: &str = "/placeholder.svg";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: TrackPage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<CatalogTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<CatalogArtist>,
    #[serde(default)]
    pub album: CatalogAlbum,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<CatalogImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

impl CatalogTrack {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or_default()
    }

    /// First (largest) album image, or the placeholder.
    pub fn cover_url(&self) -> &str {
        self.album
            .images
            .first()
            .map(|i| i.url.as_str())
            .unwrap_or(PLACEHOLDER_COVER)
    }

    pub fn catalog_url(&self) -> &str {
        self.external_urls.spotify.as_deref().unwrap_or_default()
    }
}
