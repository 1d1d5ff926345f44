use std::collections::HashSet;

use crate::Database;
use crate::models::{ClaimOutcome, FeedPage, FeedRow, NewSong, SongRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row, TransactionBehavior};

const SONG_COLUMNS: &str = "id, spotify_id, title, artist, album, album_cover, note, \
     username, color, spotify_url, user_id, user_email, created_at";

/// Like count for the outer `songs` row.
const LIKE_COUNT: &str = "(SELECT COUNT(*) FROM likes WHERE likes.song_id = songs.id)";

impl Database {
    // -- Users --

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn username_taken(&self, username: &str) -> Result<bool> {
        Ok(self.get_user_by_username(username)?.is_some())
    }

    /// Records a freshly authenticated identity. Returns `true` if the row
    /// was created, `false` if the user already existed.
    pub fn insert_user_if_absent(
        &self,
        id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if query_user(&tx, "id", id)?.is_some() {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO users (id, email, full_name) VALUES (?1, ?2, ?3)",
                (id, email, full_name),
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Upserts the user keyed by `id` with `username` (already normalized).
    /// Claiming the username the account already holds is a no-op success.
    pub fn claim_username(
        &self,
        id: &str,
        email: &str,
        username: &str,
        full_name: Option<&str>,
    ) -> Result<ClaimOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(holder) = query_user(&tx, "username", username)? {
                if holder.id != id {
                    return Ok(ClaimOutcome::Taken);
                }
                return Ok(ClaimOutcome::Claimed(holder));
            }

            if let Some(existing) = query_user(&tx, "id", id)? {
                if let Some(current) = existing.username {
                    return Ok(ClaimOutcome::AlreadyClaimed(current));
                }
            }

            tx.execute(
                "INSERT INTO users (id, email, username, full_name) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     email = excluded.email,
                     username = excluded.username,
                     full_name = COALESCE(excluded.full_name, users.full_name)",
                (id, email, username, full_name),
            )?;

            let user = query_user(&tx, "id", id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished during claim", id))?;
            tx.commit()?;
            Ok(ClaimOutcome::Claimed(user))
        })
    }

    // -- Songs --

    /// Inserts a song-note and returns the row as stored, including the
    /// assigned timestamp.
    pub fn insert_song(&self, id: &str, song: &NewSong) -> Result<SongRow> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO songs (id, spotify_id, title, artist, album, album_cover, note,
                                    username, color, spotify_url, user_id, user_email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 RETURNING {}",
                SONG_COLUMNS
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![
                    id,
                    song.spotify_id,
                    song.title,
                    song.artist,
                    song.album,
                    song.album_cover,
                    song.note,
                    song.username,
                    song.color,
                    song.spotify_url,
                    song.user_id,
                    song.user_email,
                ],
                song_from_row,
            )?;
            Ok(row)
        })
    }

    /// One page of the global feed, newest first.
    ///
    /// The total, the page and the viewer's liked set are read inside one
    /// transaction so `total` always describes the same snapshot as `rows`.
    pub fn feed_page(&self, offset: u32, limit: u32, viewer: Option<&str>) -> Result<FeedPage> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let total: i64 = tx.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;

            let sql = format!(
                "SELECT {}, {}
                 FROM songs
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2",
                SONG_COLUMNS, LIKE_COUNT
            );
            let rows = query_feed_rows(&tx, &sql, rusqlite::params![limit, offset])?;

            let liked = match viewer {
                Some(user_id) => query_liked_song_ids(&tx, user_id)?,
                None => HashSet::new(),
            };

            tx.commit()?;
            Ok(FeedPage {
                rows,
                total: total as u64,
                liked,
            })
        })
    }

    /// All song-notes owned by the account with `email`, newest first.
    pub fn songs_by_email(&self, email: &str, viewer: Option<&str>) -> Result<FeedPage> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let sql = format!(
                "SELECT {}, {}
                 FROM songs
                 WHERE user_email = ?1
                 ORDER BY created_at DESC, rowid DESC",
                SONG_COLUMNS, LIKE_COUNT
            );
            let rows = query_feed_rows(&tx, &sql, [email])?;

            let liked = match viewer {
                Some(user_id) => query_liked_song_ids(&tx, user_id)?,
                None => HashSet::new(),
            };

            tx.commit()?;
            Ok(FeedPage {
                total: rows.len() as u64,
                rows,
                liked,
            })
        })
    }

    // -- Likes --

    /// Toggle the (song, user) like: removes it if present, inserts it if not.
    ///
    /// Returns `None` when the song does not exist, otherwise `Some(liked)`
    /// with the state after the toggle. Both steps run in one immediate
    /// transaction and the pair is the table's primary key, so there is never
    /// more than one row per pair.
    pub fn toggle_like(&self, song_id: &str, user_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let song_exists = tx
                .query_row("SELECT 1 FROM songs WHERE id = ?1", [song_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !song_exists {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM likes WHERE song_id = ?1 AND user_id = ?2",
                (song_id, user_id),
            )?;

            let liked = if removed > 0 {
                false
            } else {
                tx.execute(
                    "INSERT OR IGNORE INTO likes (song_id, user_id) VALUES (?1, ?2)",
                    (song_id, user_id),
                )?;
                true
            };

            tx.commit()?;
            Ok(Some(liked))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a literal from this module, never caller input.
    let sql = format!(
        "SELECT id, email, username, full_name, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            full_name: row.get(3)?,
            created_at: row.get(4)?,
        })
    })
    .optional()
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<SongRow> {
    Ok(SongRow {
        id: row.get(0)?,
        spotify_id: row.get(1)?,
        title: row.get(2)?,
        artist: row.get(3)?,
        album: row.get(4)?,
        album_cover: row.get(5)?,
        note: row.get(6)?,
        username: row.get(7)?,
        color: row.get(8)?,
        spotify_url: row.get(9)?,
        user_id: row.get(10)?,
        user_email: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn query_feed_rows<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<FeedRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(FeedRow {
                song: song_from_row(row)?,
                likes: row.get::<_, i64>(13)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Every song id the user has liked, in one query.
fn query_liked_song_ids(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT song_id FROM likes WHERE user_id = ?1")?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;

    Ok(ids)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Lookups only the tests need.
#[cfg(test)]
impl Database {
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_song(&self, id: &str) -> Result<Option<SongRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS);
            conn.query_row(&sql, [id], song_from_row).optional()
        })
    }

    pub fn like_count(&self, song_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE song_id = ?1",
                [song_id],
                |r| r.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(spotify_id: &str, text: &str, email: Option<&str>) -> NewSong {
        NewSong {
            spotify_id: spotify_id.to_string(),
            title: format!("Title {}", spotify_id),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            album_cover: "/placeholder.svg".to_string(),
            note: text.to_string(),
            username: "someone".to_string(),
            color: "teal".to_string(),
            spotify_url: format!("https://open.example/track/{}", spotify_id),
            user_id: Some("u1".to_string()),
            user_email: email.map(str::to_string),
        }
    }

    fn seed(db: &Database, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let id = format!("song-{:02}", i);
                db.insert_song(&id, &note(&format!("T{}", i), "memory", None))
                    .unwrap();
                id
            })
            .collect()
    }

    #[test]
    fn insert_returns_materialized_row() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_song("s1", &note("T1", "hello", Some("a@example.com"))).unwrap();

        assert_eq!(row.id, "s1");
        assert_eq!(row.spotify_id, "T1");
        assert_eq!(row.note, "hello");
        assert_eq!(row.user_email.as_deref(), Some("a@example.com"));
        assert!(row.created_at.ends_with('Z'));

        let fetched = db.get_song("s1").unwrap().unwrap();
        assert_eq!(fetched.created_at, row.created_at);
    }

    #[test]
    fn empty_feed_has_zero_total() {
        let db = Database::open_in_memory().unwrap();
        let page = db.feed_page(0, 9, Some("u1")).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn pages_are_disjoint_and_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let inserted = seed(&db, 10);

        let first = db.feed_page(0, 9, None).unwrap();
        let second = db.feed_page(9, 9, None).unwrap();
        assert_eq!(first.total, 10);
        assert_eq!(first.rows.len(), 9);
        assert_eq!(second.rows.len(), 1);

        let listed: Vec<String> = first
            .rows
            .iter()
            .chain(second.rows.iter())
            .map(|r| r.song.id.clone())
            .collect();
        let mut expected = inserted;
        expected.reverse();
        assert_eq!(listed, expected);
    }

    #[test]
    fn page_annotates_like_counts_and_viewer_likes() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, 3);
        assert_eq!(db.toggle_like("song-01", "u1").unwrap(), Some(true));
        assert_eq!(db.toggle_like("song-01", "u2").unwrap(), Some(true));
        assert_eq!(db.toggle_like("song-02", "u2").unwrap(), Some(true));

        let page = db.feed_page(0, 9, Some("u1")).unwrap();
        let likes: Vec<(String, u64)> = page
            .rows
            .iter()
            .map(|r| (r.song.id.clone(), r.likes))
            .collect();
        assert_eq!(
            likes,
            vec![
                ("song-02".to_string(), 1),
                ("song-01".to_string(), 2),
                ("song-00".to_string(), 0),
            ]
        );
        assert!(page.viewer_likes("song-01"));
        assert!(!page.viewer_likes("song-02"));
    }

    #[test]
    fn toggle_alternates_and_never_duplicates() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, 1);

        for i in 1..=7 {
            let liked = db.toggle_like("song-00", "u1").unwrap().unwrap();
            assert_eq!(liked, i % 2 == 1);
            let count = db.like_count("song-00").unwrap();
            assert!(count <= 1);
            assert_eq!(count == 1, liked);
        }
    }

    #[test]
    fn toggle_on_missing_song_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.toggle_like("nope", "u1").unwrap(), None);
    }

    #[test]
    fn concurrent_toggles_keep_at_most_one_row() {
        let db = std::sync::Arc::new(Database::open_in_memory().unwrap());
        seed(&db, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.toggle_like("song-00", "u1").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Eight toggles from the same user always land back on "not liked".
        assert_eq!(db.like_count("song-00").unwrap(), 0);
    }

    #[test]
    fn insert_user_only_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_user_if_absent("idp-1", "a@example.com", Some("Ada")).unwrap());
        assert!(!db.insert_user_if_absent("idp-1", "a@example.com", Some("Ada")).unwrap());

        let user = db.get_user_by_id("idp-1").unwrap().unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(user.username.is_none());
    }

    #[test]
    fn claim_username_rules() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user_if_absent("idp-1", "a@example.com", Some("Ada")).unwrap();

        match db.claim_username("idp-1", "a@example.com", "ada", None).unwrap() {
            ClaimOutcome::Claimed(user) => {
                assert_eq!(user.username.as_deref(), Some("ada"));
                assert_eq!(user.full_name.as_deref(), Some("Ada"));
            }
            _ => panic!("expected claim to succeed"),
        }
        assert!(db.username_taken("ada").unwrap());

        // Same account, same name: idempotent.
        assert!(matches!(
            db.claim_username("idp-1", "a@example.com", "ada", None).unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        // Same account, different name.
        assert!(matches!(
            db.claim_username("idp-1", "a@example.com", "ada2", None).unwrap(),
            ClaimOutcome::AlreadyClaimed(current) if current == "ada"
        ));
        // Different account, taken name.
        assert!(matches!(
            db.claim_username("idp-2", "b@example.com", "ada", None).unwrap(),
            ClaimOutcome::Taken
        ));
    }

    #[test]
    fn claim_upserts_unknown_account() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.claim_username("idp-9", "z@example.com", "zed", Some("Zed")).unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        let user = db.get_user_by_username("zed").unwrap().unwrap();
        assert_eq!(user.id, "idp-9");
    }

    #[test]
    fn profile_listing_matches_email_only() {
        let db = Database::open_in_memory().unwrap();
        db.insert_song("a", &note("T1", "mine", Some("a@example.com"))).unwrap();
        db.insert_song("b", &note("T2", "anonymous", None)).unwrap();
        db.insert_song("c", &note("T3", "someone else", Some("b@example.com"))).unwrap();
        db.insert_song("d", &note("T4", "mine again", Some("a@example.com"))).unwrap();

        let page = db.songs_by_email("a@example.com", None).unwrap();
        let ids: Vec<&str> = page.rows.iter().map(|r| r.song.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
        assert_eq!(page.total, 2);
    }
}
