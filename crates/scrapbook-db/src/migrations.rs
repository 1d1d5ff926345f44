use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                username    TEXT UNIQUE,
                full_name   TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE songs (
                id           TEXT PRIMARY KEY,
                spotify_id   TEXT NOT NULL,
                title        TEXT NOT NULL,
                artist       TEXT NOT NULL,
                album        TEXT NOT NULL,
                album_cover  TEXT NOT NULL,
                note         TEXT NOT NULL,
                username     TEXT NOT NULL,
                color        TEXT NOT NULL,
                spotify_url  TEXT NOT NULL,
                user_id      TEXT,
                user_email   TEXT,
                created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_songs_created ON songs(created_at);
            CREATE INDEX idx_songs_user_email ON songs(user_email);

            -- One row per (song, user): a like either exists or it doesn't.
            CREATE TABLE likes (
                song_id     TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (song_id, user_id)
            );

            CREATE INDEX idx_likes_user ON likes(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
