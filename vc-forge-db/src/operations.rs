//! Write operations on the compatibility store.

use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Schema error: {0}")]
    Schema(#[from] crate::schema::SchemaError),
    #[error("CSV import error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Import error: {0}")]
    Import(String),
}

/// One compatibility record, keyed by (title, region).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityRecord {
    pub title: String,
    /// Region code as stored ("USA", "EUR", "JPN", "KOR").
    pub region: String,
    /// Content id, once learned.
    pub content_id: Option<String>,
    /// Recommended base content whose runtime files scaffold the package.
    pub base_content: String,
    pub gamepad_support: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    /// Localized title learned from the artwork source.
    pub title_local: Option<String>,
    pub title_en: Option<String>,
}

/// Insert or replace a record by its (title, region) key.
pub fn upsert_record(conn: &Connection, record: &CompatibilityRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO games
             (title, region, content_id, base_content, gamepad_support, status, notes,
              title_local, title_en)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(title, region) DO UPDATE SET
             content_id = excluded.content_id,
             base_content = excluded.base_content,
             gamepad_support = excluded.gamepad_support,
             status = excluded.status,
             notes = excluded.notes,
             title_local = COALESCE(excluded.title_local, games.title_local),
             title_en = COALESCE(excluded.title_en, games.title_en)",
        params![
            record.title,
            record.region,
            record.content_id,
            record.base_content,
            record.gamepad_support,
            record.status,
            record.notes,
            record.title_local,
            record.title_en,
        ],
    )?;
    Ok(())
}

/// Record a learned content id for a (title, region) pair.
pub fn learn_content_id(
    conn: &Connection,
    title: &str,
    region: &str,
    content_id: &str,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE games SET content_id = ?1 WHERE title = ?2 AND region = ?3",
        params![content_id, title, region],
    )?;
    if changed > 0 {
        log::info!("learned content id mapping: {title} ({region}) = {content_id}");
    }
    Ok(())
}

/// Rename a record's title, keeping its region key.
pub fn update_title(
    conn: &Connection,
    old_title: &str,
    region: &str,
    new_title: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE games SET title = ?1 WHERE title = ?2 AND region = ?3",
        params![new_title, old_title, region],
    )?;
    Ok(())
}

/// Store localized titles against a known content id.
pub fn update_localized_titles(
    conn: &Connection,
    content_id: &str,
    title_local: Option<&str>,
    title_en: Option<&str>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE games
         SET title_local = COALESCE(?1, title_local),
             title_en = COALESCE(?2, title_en)
         WHERE content_id = ?3",
        params![title_local, title_en, content_id],
    )?;
    Ok(())
}

/// Set the default title key for a base content.
pub fn set_base_content_key(
    conn: &Connection,
    base_content: &str,
    title_key: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO base_contents (name, default_title_key) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET default_title_key = excluded.default_title_key",
        params![base_content, title_key],
    )?;
    Ok(())
}

/// Look up the default title key for a base content, if one was stored.
pub fn base_content_key(
    conn: &Connection,
    base_content: &str,
) -> Result<Option<String>, StoreError> {
    let key = conn
        .query_row(
            "SELECT default_title_key FROM base_contents WHERE name = ?1",
            params![base_content],
            |row| row.get::<_, Option<String>>(0),
        )
        .unwrap_or(None);
    Ok(key.filter(|k| !k.is_empty()))
}
