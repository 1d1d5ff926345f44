//! Wire types shared by the scrapbook server and its clients.

pub mod api;
pub mod catalog;

/// Fixed number of song-notes per feed page.
pub const FEED_PAGE_SIZE: u32 = 9;
