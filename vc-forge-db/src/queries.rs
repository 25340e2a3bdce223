//! Read queries against the compatibility store.

use rusqlite::{Connection, Row, params};

use crate::operations::{CompatibilityRecord, StoreError};

const RECORD_COLUMNS: &str = "title, region, content_id, base_content, gamepad_support, \
     status, notes, title_local, title_en";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CompatibilityRecord> {
    Ok(CompatibilityRecord {
        title: row.get(0)?,
        region: row.get(1)?,
        content_id: row.get(2)?,
        base_content: row.get(3)?,
        gamepad_support: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        title_local: row.get(7)?,
        title_en: row.get(8)?,
    })
}

/// Look up a record by its learned content id.
pub fn find_by_content_id(
    conn: &Connection,
    content_id: &str,
) -> Result<Option<CompatibilityRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM games WHERE content_id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![content_id], record_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Look up a record by its (title, region) primary key.
pub fn find_by_title_region(
    conn: &Connection,
    title: &str,
    region: &str,
) -> Result<Option<CompatibilityRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM games WHERE title = ?1 AND region = ?2"
    ))?;
    let mut rows = stmt.query_map(params![title, region], record_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// All records for one region, ordered by title.
pub fn records_for_region(
    conn: &Connection,
    region: &str,
) -> Result<Vec<CompatibilityRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM games WHERE region = ?1 ORDER BY title"
    ))?;
    let rows = stmt.query_map(params![region], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Substring search over titles, case-insensitive, ordered by title.
pub fn search_titles(
    conn: &Connection,
    pattern: &str,
) -> Result<Vec<CompatibilityRecord>, StoreError> {
    let like = format!("%{}%", pattern.replace('%', "\\%").replace('_', "\\_"));
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM games
         WHERE title LIKE ?1 ESCAPE '\\'
         ORDER BY title, region"
    ))?;
    let rows = stmt.query_map(params![like], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every record in the store, ordered by title then region.
pub fn all_records(conn: &Connection) -> Result<Vec<CompatibilityRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM games ORDER BY title, region"
    ))?;
    let rows = stmt.query_map([], record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Aggregate counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub with_content_id: u64,
    pub base_contents: u64,
}

pub fn store_stats(conn: &Connection) -> Result<StoreStats, StoreError> {
    let total: u64 = conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
    let with_content_id: u64 = conn.query_row(
        "SELECT COUNT(*) FROM games WHERE content_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    let base_contents: u64 =
        conn.query_row("SELECT COUNT(*) FROM base_contents", [], |row| row.get(0))?;
    Ok(StoreStats {
        total,
        with_content_id,
        base_contents,
    })
}
