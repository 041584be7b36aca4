use crate::Database;
use crate::models::{
    CollectionChanges, CollectionRow, InsertOutcome, MediaChanges, MediaFilter, MediaPage,
    MediaRow, NewCollection, NewMedia, StatsRow, StoredMedia,
};
use anyhow::{Result, anyhow};
use archivist_types::media::MediaKind;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row, params_from_iter};

/// ISO-8601 UTC with milliseconds; lexical order == chronological order.
const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const MEDIA_COLUMNS: &str = "id, title, description, media_type, mime_type, file_size, tags, \
     source_info, lost_date, found_date, created_at, updated_at, view_count, is_public";

impl Database {
    // -- Media --

    /// Insert a freshly uploaded record. The content identifier check and the
    /// insert happen in one transaction so `cid` stays unique.
    pub fn insert_media(&self, new: &NewMedia) -> Result<InsertOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row("SELECT id FROM media WHERE cid = ?1", [&new.cid], |row| {
                    row.get(0)
                })
                .optional()?;
            if let Some(existing_id) = existing {
                return Ok(InsertOutcome::DuplicateContent { existing_id });
            }

            tx.execute(
                "INSERT INTO media (id, cid, title, description, media_type, mime_type, file_size,
                                    tags, source_info, lost_date, found_date, uploader_ip)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    new.id,
                    new.cid,
                    new.title,
                    new.description,
                    new.media_type.as_str(),
                    new.mime_type,
                    new.file_size.map(|s| s as i64),
                    new.tags,
                    new.source_info,
                    new.lost_date,
                    new.found_date,
                    new.uploader_ip,
                ],
            )?;

            let row = query_media(&tx, &new.id)?
                .ok_or_else(|| anyhow!("Inserted media {} not readable", new.id))?;
            tx.commit()?;

            Ok(InsertOutcome::Created(row))
        })
    }

    /// Fetch by public id regardless of visibility.
    pub fn get_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| query_media(conn, id))
    }

    /// Fetch including the hidden content identifier (internal use only).
    pub fn get_stored_media(&self, id: &str) -> Result<Option<StoredMedia>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MEDIA_COLUMNS}, cid FROM media WHERE id = ?1");
            let row = conn
                .query_row(&sql, [id], |row| {
                    Ok(StoredMedia {
                        media: map_media(row)?,
                        cid: row.get(14)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Count one view of a public record and return it with the new count.
    /// Hidden and unknown ids yield `None` and are left untouched.
    pub fn view_public_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE media SET view_count = view_count + 1 WHERE id = ?1 AND is_public = 1",
                [id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_media(conn, id)
        })
    }

    pub fn list_public_media(&self, filter: &MediaFilter) -> Result<MediaPage> {
        self.with_conn(|conn| query_public_page(conn, filter))
    }

    pub fn recent_media(&self, limit: u32) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            query_media_list(
                conn,
                &format!(
                    "SELECT {MEDIA_COLUMNS} FROM media WHERE is_public = 1
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                [limit],
            )
        })
    }

    pub fn popular_media(&self, limit: u32) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            query_media_list(
                conn,
                &format!(
                    "SELECT {MEDIA_COLUMNS} FROM media WHERE is_public = 1
                     ORDER BY view_count DESC, created_at DESC LIMIT ?1"
                ),
                [limit],
            )
        })
    }

    /// Apply whitelisted changes. Returns `None` for an unknown id.
    pub fn update_media(&self, id: &str, changes: &MediaChanges) -> Result<Option<MediaRow>> {
        self.with_conn_mut(|conn| {
            if changes.is_empty() {
                return query_media(conn, id);
            }

            let mut fields: Vec<String> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(title) = &changes.title {
                fields.push("title = ?".into());
                values.push(Value::Text(title.clone()));
            }
            for (column, change) in [
                ("description", &changes.description),
                ("tags", &changes.tags),
                ("source_info", &changes.source_info),
                ("lost_date", &changes.lost_date),
                ("found_date", &changes.found_date),
            ] {
                if let Some(value) = change {
                    fields.push(format!("{column} = ?"));
                    values.push(nullable_text(value));
                }
            }
            if let Some(is_public) = changes.is_public {
                fields.push("is_public = ?".into());
                values.push(Value::Integer(is_public as i64));
            }

            fields.push(format!("updated_at = {NOW}"));
            values.push(Value::Text(id.to_string()));

            let sql = format!("UPDATE media SET {} WHERE id = ?", fields.join(", "));
            let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
            if changed == 0 {
                return Ok(None);
            }

            query_media(conn, id)
        })
    }

    /// Remove the metadata row. Links cascade; stored content is untouched.
    pub fn delete_media(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM media WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn media_stats(&self) -> Result<StatsRow> {
        self.with_conn(|conn| {
            let (total_media, total_views): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(view_count), 0) FROM media WHERE is_public = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut stmt = conn.prepare(
                "SELECT media_type, COUNT(*) FROM media WHERE is_public = 1
                 GROUP BY media_type ORDER BY media_type",
            )?;
            let by_type = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(StatsRow {
                total_media: total_media as u64,
                total_views: total_views as u64,
                by_type,
            })
        })
    }

    // -- Collections --

    pub fn insert_collection(&self, new: &NewCollection) -> Result<CollectionRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO collections (id, name, description, cover_image_cid)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![new.id, new.name, new.description, new.cover_image_cid],
            )?;
            query_collection(conn, &new.id)?
                .ok_or_else(|| anyhow!("Inserted collection {} not readable", new.id))
        })
    }

    pub fn get_collection(&self, id: &str) -> Result<Option<CollectionRow>> {
        self.with_conn(|conn| query_collection(conn, id))
    }

    pub fn list_collections(&self) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, cover_image_cid, created_at, updated_at
                 FROM collections ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], map_collection)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_collection(
        &self,
        id: &str,
        changes: &CollectionChanges,
    ) -> Result<Option<CollectionRow>> {
        self.with_conn_mut(|conn| {
            if changes.is_empty() {
                return query_collection(conn, id);
            }

            let mut fields: Vec<String> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(name) = &changes.name {
                fields.push("name = ?".into());
                values.push(Value::Text(name.clone()));
            }
            if let Some(description) = &changes.description {
                fields.push("description = ?".into());
                values.push(nullable_text(description));
            }
            if let Some(cover) = &changes.cover_image_cid {
                fields.push("cover_image_cid = ?".into());
                values.push(nullable_text(cover));
            }

            fields.push(format!("updated_at = {NOW}"));
            values.push(Value::Text(id.to_string()));

            let sql = format!("UPDATE collections SET {} WHERE id = ?", fields.join(", "));
            let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
            if changed == 0 {
                return Ok(None);
            }

            query_collection(conn, id)
        })
    }

    pub fn delete_collection(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM collections WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Link a media item. Returns false when it was already a member.
    pub fn add_to_collection(&self, collection_id: &str, media_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO collection_media (collection_id, media_id) VALUES (?1, ?2)",
                [collection_id, media_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_from_collection(&self, collection_id: &str, media_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM collection_media WHERE collection_id = ?1 AND media_id = ?2",
                [collection_id, media_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Public members of a collection, most recently added first.
    pub fn collection_media(&self, collection_id: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            query_media_list(
                conn,
                "SELECT m.id, m.title, m.description, m.media_type, m.mime_type, m.file_size,
                        m.tags, m.source_info, m.lost_date, m.found_date, m.created_at,
                        m.updated_at, m.view_count, m.is_public
                 FROM media m
                 JOIN collection_media cm ON m.id = cm.media_id
                 WHERE cm.collection_id = ?1 AND m.is_public = 1
                 ORDER BY cm.added_at DESC, cm.rowid DESC",
                [collection_id],
            )
        })
    }
}

fn query_media(conn: &Connection, id: &str) -> Result<Option<MediaRow>> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_media).optional()?;
    Ok(row)
}

fn query_media_list<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MediaRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_media)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_public_page(conn: &Connection, filter: &MediaFilter) -> Result<MediaPage> {
    let mut clause = String::from("WHERE is_public = 1");
    let mut params: Vec<Value> = Vec::new();

    if let Some(kind) = filter.kind {
        clause.push_str(" AND media_type = ?");
        params.push(Value::Text(kind.as_str().to_string()));
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clause.push_str(
            " AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' OR tags LIKE ? ESCAPE '\\')",
        );
        let pattern = format!("%{}%", escape_like(term));
        params.extend(std::iter::repeat_n(Value::Text(pattern), 3));
    }

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM media {clause}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    // Ties broken by insertion order so pages never overlap
    let direction = filter.order.keyword();
    let sql = format!(
        "SELECT {MEDIA_COLUMNS} FROM media {clause}
         ORDER BY {} {direction}, rowid {direction}
         LIMIT ? OFFSET ?",
        filter.sort.column(),
    );

    let pagination = filter.pagination;
    params.push(Value::Integer(pagination.limit as i64));
    params.push(Value::Integer(pagination.offset() as i64));

    let rows = query_media_list(conn, &sql, params_from_iter(params.iter()))?;

    Ok(MediaPage {
        rows,
        total: total as u64,
    })
}

fn query_collection(conn: &Connection, id: &str) -> Result<Option<CollectionRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, description, cover_image_cid, created_at, updated_at
             FROM collections WHERE id = ?1",
            [id],
            map_collection,
        )
        .optional()?;
    Ok(row)
}

fn map_media(row: &Row<'_>) -> rusqlite::Result<MediaRow> {
    let kind: String = row.get(3)?;
    let media_type = kind
        .parse::<MediaKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;

    Ok(MediaRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        media_type,
        mime_type: row.get(4)?,
        file_size: row.get(5)?,
        tags: row.get(6)?,
        source_info: row.get(7)?,
        lost_date: row.get(8)?,
        found_date: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        view_count: row.get(12)?,
        is_public: row.get(13)?,
    })
}

fn map_collection(row: &Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        cover_image_cid: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn nullable_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

/// Escape LIKE wildcards so a search for `100%` matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
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

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_types::query::{Pagination, SortField, SortOrder};

    fn new_media(id: &str, cid: &str, title: &str) -> NewMedia {
        NewMedia {
            id: id.to_string(),
            cid: cid.to_string(),
            title: title.to_string(),
            description: None,
            media_type: MediaKind::Video,
            mime_type: "video/mp4".to_string(),
            file_size: Some(1024),
            tags: None,
            source_info: None,
            lost_date: None,
            found_date: None,
            uploader_ip: Some("127.0.0.1".to_string()),
        }
    }

    fn insert(db: &Database, new: NewMedia) -> MediaRow {
        match db.insert_media(&new).unwrap() {
            InsertOutcome::Created(row) => row,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    fn hide(db: &Database, id: &str) {
        let changes = MediaChanges {
            is_public: Some(false),
            ..Default::default()
        };
        db.update_media(id, &changes).unwrap().unwrap();
    }

    #[test]
    fn insert_sets_defaults() {
        let db = Database::open_in_memory().unwrap();
        let row = insert(&db, new_media("abc", "bafyA", "Lost pilot"));

        assert_eq!(row.id, "abc");
        assert_eq!(row.view_count, 0);
        assert!(row.is_public);
        assert_eq!(row.media_type, MediaKind::Video);
        assert!(row.created_at.ends_with('Z'));
    }

    #[test]
    fn duplicate_content_is_reported_not_inserted() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("first", "bafySame", "One"));

        match db.insert_media(&new_media("second", "bafySame", "Two")).unwrap() {
            InsertOutcome::DuplicateContent { existing_id } => assert_eq!(existing_id, "first"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(db.get_media("second").unwrap().is_none());
    }

    #[test]
    fn stored_media_carries_the_content_identifier() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("abc", "bafyHidden", "Reel"));

        let stored = db.get_stored_media("abc").unwrap().unwrap();
        assert_eq!(stored.cid, "bafyHidden");
        assert_eq!(stored.media.title, "Reel");
        assert!(db.get_stored_media("nope").unwrap().is_none());
    }

    #[test]
    fn second_page_of_forty_five() {
        let db = Database::open_in_memory().unwrap();
        for i in 1..=45 {
            insert(&db, new_media(&format!("id{i:02}"), &format!("cid{i:02}"), &format!("Item {i:02}")));
        }

        let filter = MediaFilter {
            sort: SortField::Title,
            order: SortOrder::Asc,
            pagination: Pagination::new(Some(2), Some(20)),
            ..Default::default()
        };
        let page = db.list_public_media(&filter).unwrap();

        assert_eq!(page.total, 45);
        assert_eq!(page.rows.len(), 20);
        assert_eq!(page.rows.first().unwrap().title, "Item 21");
        assert_eq!(page.rows.last().unwrap().title, "Item 40");
        assert_eq!(filter.pagination.total_pages(page.total), 3);
    }

    #[test]
    fn default_order_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for i in 1..=3 {
            insert(&db, new_media(&format!("id{i}"), &format!("cid{i}"), &format!("T{i}")));
        }

        let page = db.list_public_media(&MediaFilter::default()).unwrap();
        let ids: Vec<&str> = page.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id3", "id2", "id1"]);
    }

    #[test]
    fn hidden_media_is_excluded_everywhere() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("shown", "cid1", "Shown"));
        insert(&db, new_media("hidden", "cid2", "Hidden"));
        hide(&db, "hidden");

        let page = db.list_public_media(&MediaFilter::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].id, "shown");

        assert!(db.view_public_media("hidden").unwrap().is_none());
        assert_eq!(db.recent_media(10).unwrap().len(), 1);
        assert_eq!(db.popular_media(10).unwrap().len(), 1);
        assert_eq!(db.media_stats().unwrap().total_media, 1);

        // Still reachable for edits
        assert!(db.get_media("hidden").unwrap().is_some());
    }

    #[test]
    fn search_and_kind_filter() {
        let db = Database::open_in_memory().unwrap();
        let mut tape = new_media("tape", "cid1", "Betamax tape");
        tape.tags = Some("vhs,1987".to_string());
        insert(&db, tape);

        let mut photo = new_media("photo", "cid2", "Studio photo");
        photo.media_type = MediaKind::Image;
        photo.mime_type = "image/png".to_string();
        photo.description = Some("A 100% authentic still".to_string());
        insert(&db, photo);

        let by_tag = db
            .list_public_media(&MediaFilter {
                search: Some("VHS".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_tag.total, 1);
        assert_eq!(by_tag.rows[0].id, "tape");

        let literal_percent = db
            .list_public_media(&MediaFilter {
                search: Some("100%".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(literal_percent.total, 1);
        assert_eq!(literal_percent.rows[0].id, "photo");

        let images = db
            .list_public_media(&MediaFilter {
                kind: Some(MediaKind::Image),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(images.total, 1);
        assert_eq!(images.rows[0].id, "photo");
    }

    #[test]
    fn each_view_counts_once() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("abc", "cid", "Clip"));

        assert_eq!(db.view_public_media("abc").unwrap().unwrap().view_count, 1);
        assert_eq!(db.view_public_media("abc").unwrap().unwrap().view_count, 2);
        assert!(db.view_public_media("missing").unwrap().is_none());
    }

    #[test]
    fn update_sets_and_clears_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut new = new_media("abc", "cid", "Old title");
        new.description = Some("to be cleared".to_string());
        let before = insert(&db, new);

        let changes = MediaChanges {
            title: Some("New title".to_string()),
            description: Some(None),
            tags: Some(Some("a,b".to_string())),
            ..Default::default()
        };
        let after = db.update_media("abc", &changes).unwrap().unwrap();

        assert_eq!(after.title, "New title");
        assert_eq!(after.description, None);
        assert_eq!(after.tags.as_deref(), Some("a,b"));
        assert!(after.updated_at >= before.updated_at);

        assert!(db.update_media("missing", &changes).unwrap().is_none());
        assert!(db.update_media("missing", &MediaChanges::default()).unwrap().is_none());
    }

    #[test]
    fn delete_cascades_links_and_tolerates_no_links() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("linked", "cid1", "Linked"));
        insert(&db, new_media("loose", "cid2", "Loose"));
        db.insert_collection(&NewCollection {
            id: "col".to_string(),
            name: "Shelf".to_string(),
            description: None,
            cover_image_cid: None,
        })
        .unwrap();
        assert!(db.add_to_collection("col", "linked").unwrap());

        assert!(db.delete_media("linked").unwrap());
        assert!(db.delete_media("loose").unwrap());
        assert!(!db.delete_media("loose").unwrap());

        let links: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM collection_media", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(links, 0);
    }

    #[test]
    fn stats_group_by_kind() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("v1", "cid1", "V1"));
        insert(&db, new_media("v2", "cid2", "V2"));
        let mut doc = new_media("d1", "cid3", "D1");
        doc.media_type = MediaKind::Document;
        doc.mime_type = "application/pdf".to_string();
        insert(&db, doc);
        db.view_public_media("v1").unwrap();
        db.view_public_media("d1").unwrap();
        db.view_public_media("d1").unwrap();

        let stats = db.media_stats().unwrap();
        assert_eq!(stats.total_media, 3);
        assert_eq!(stats.total_views, 3);
        assert_eq!(
            stats.by_type,
            vec![("document".to_string(), 1), ("video".to_string(), 2)]
        );

        let popular = db.popular_media(1).unwrap();
        assert_eq!(popular[0].id, "d1");
    }

    #[test]
    fn empty_archive_stats_are_zero() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.media_stats().unwrap();
        assert_eq!(stats.total_media, 0);
        assert_eq!(stats.total_views, 0);
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn collection_membership() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("a", "cid1", "A"));
        insert(&db, new_media("b", "cid2", "B"));
        insert(&db, new_media("secret", "cid3", "Secret"));
        hide(&db, "secret");

        db.insert_collection(&NewCollection {
            id: "col".to_string(),
            name: "Shelf".to_string(),
            description: Some("Tapes".to_string()),
            cover_image_cid: None,
        })
        .unwrap();

        assert!(db.add_to_collection("col", "a").unwrap());
        assert!(db.add_to_collection("col", "b").unwrap());
        assert!(db.add_to_collection("col", "secret").unwrap());
        assert!(!db.add_to_collection("col", "a").unwrap());

        let members: Vec<String> = db
            .collection_media("col")
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(members, vec!["b".to_string(), "a".to_string()]);

        assert!(db.remove_from_collection("col", "b").unwrap());
        assert!(!db.remove_from_collection("col", "b").unwrap());
        assert_eq!(db.collection_media("col").unwrap().len(), 1);
    }

    #[test]
    fn collection_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, new_media("a", "cid1", "A"));
        db.insert_collection(&NewCollection {
            id: "col".to_string(),
            name: "Shelf".to_string(),
            description: Some("Tapes".to_string()),
            cover_image_cid: Some("bafyCover".to_string()),
        })
        .unwrap();
        db.add_to_collection("col", "a").unwrap();

        let changes = CollectionChanges {
            name: Some("Archive shelf".to_string()),
            description: Some(None),
            ..Default::default()
        };
        let updated = db.update_collection("col", &changes).unwrap().unwrap();
        assert_eq!(updated.name, "Archive shelf");
        assert_eq!(updated.description, None);
        assert_eq!(updated.cover_image_cid.as_deref(), Some("bafyCover"));

        assert_eq!(db.list_collections().unwrap().len(), 1);
        assert!(db.delete_collection("col").unwrap());
        assert!(db.get_collection("col").unwrap().is_none());
        assert!(db.list_collections().unwrap().is_empty());

        // Media survives its collection
        assert!(db.get_media("a").unwrap().is_some());
    }

    #[test]
    fn escape_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
