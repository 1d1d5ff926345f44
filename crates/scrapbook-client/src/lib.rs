//! Client-side feed controller for the song scrapbook.
//!
//! Holds the viewer's in-memory projection of the feed (the songs fetched so
//! far, each annotated with a like count and a "have I liked this" flag) and
//! drives it against the HTTP API: page-by-page loading, optimistic like
//! toggles, note submission and debounced catalog search.

pub mod api;
pub mod debounce;
pub mod error;
pub mod feed;
pub mod identity;

#[cfg(test)]
mod testing;

pub use api::{FeedApi, HttpFeedApi};
pub use debounce::SearchDebouncer;
pub use error::ClientError;
pub use feed::{FeedController, FeedState, FeedView, LikeOutcome, LoadOutcome, SubmitOutcome};
pub use identity::AnonymousIdentity;
