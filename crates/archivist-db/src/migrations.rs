use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS media (
            id              TEXT PRIMARY KEY,
            cid             TEXT NOT NULL UNIQUE,
            title           TEXT NOT NULL,
            description     TEXT,
            media_type      TEXT NOT NULL
                CHECK (media_type IN ('video', 'image', 'audio', 'document')),
            mime_type       TEXT NOT NULL,
            file_size       INTEGER,
            thumbnail_cid   TEXT,
            tags            TEXT,
            source_info     TEXT,
            lost_date       TEXT,
            found_date      TEXT,
            uploader_ip     TEXT,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            view_count      INTEGER NOT NULL DEFAULT 0,
            is_public       INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_media_type ON media(media_type);
        CREATE INDEX IF NOT EXISTS idx_media_created_at ON media(created_at);
        CREATE INDEX IF NOT EXISTS idx_media_is_public ON media(is_public);
        CREATE INDEX IF NOT EXISTS idx_media_view_count ON media(view_count);

        CREATE TABLE IF NOT EXISTS collections (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            description     TEXT,
            cover_image_cid TEXT,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS collection_media (
            collection_id   TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            media_id        TEXT NOT NULL REFERENCES media(id) ON DELETE CASCADE,
            added_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (collection_id, media_id)
        );

        CREATE INDEX IF NOT EXISTS idx_collection_media_media
            ON collection_media(media_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
