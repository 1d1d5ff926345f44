use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Song {0} is not in the feed")]
    UnknownSong(String),

    #[error("No track selected")]
    NoTrackSelected,
}
