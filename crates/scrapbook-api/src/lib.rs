//! HTTP handlers for the song scrapbook: the feed, likes, the catalog search
//! proxy, sign-in, usernames, profiles and share images.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod likes;
pub mod middleware;
pub mod og;
pub mod router;
pub mod songs;
pub mod state;
pub mod users;

pub use router::router;
pub use state::{AppState, AppStateInner};
