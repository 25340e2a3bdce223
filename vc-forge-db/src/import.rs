//! CSV import for community compatibility sheets.
//!
//! Expected header row:
//! `Title,Region,Host_Game,Gamepad_Compatibility,Status,Notes`.
//! Region values accept the legacy spellings found in the sheets
//! ("JAP", "PAL") as well as the canonical codes.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use vc_forge_core::Region;

use crate::operations::{CompatibilityRecord, StoreError, upsert_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
    pub base_contents: u64,
}

/// Import a compatibility CSV, upserting by (title, region).
///
/// Every distinct host game named in the sheet is also registered in
/// `base_contents` so its runtime files can be fetched on first use.
pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportStats, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| StoreError::Import(format!("missing column '{name}'")))
    };
    let col_title = column("Title")?;
    let col_region = column("Region")?;
    let col_host = column("Host_Game")?;
    let col_gamepad = column("Gamepad_Compatibility")?;
    let col_status = column("Status")?;
    let col_notes = column("Notes")?;

    let mut stats = ImportStats::default();
    let mut hosts: HashSet<String> = HashSet::new();

    for result in reader.records() {
        let row = result?;
        let field = |idx: usize| row.get(idx).unwrap_or("").trim().to_string();
        let optional = |idx: usize| Some(field(idx)).filter(|s| !s.is_empty());

        let title = field(col_title);
        let base_content = field(col_host);
        if title.is_empty() || base_content.is_empty() {
            stats.skipped += 1;
            continue;
        }

        let region = Region::from_code(&field(col_region));
        if region == Region::Unknown {
            log::warn!("skipping '{title}': unrecognized region '{}'", field(col_region));
            stats.skipped += 1;
            continue;
        }

        hosts.insert(base_content.clone());
        upsert_record(
            conn,
            &CompatibilityRecord {
                title,
                region: region.code().to_string(),
                content_id: None,
                base_content,
                gamepad_support: optional(col_gamepad),
                status: optional(col_status),
                notes: optional(col_notes),
                title_local: None,
                title_en: None,
            },
        )?;
        stats.imported += 1;
    }

    for host in &hosts {
        conn.execute(
            "INSERT OR IGNORE INTO base_contents (name) VALUES (?1)",
            [host],
        )?;
    }
    stats.base_contents = hosts.len() as u64;

    log::info!(
        "imported {} records ({} skipped, {} base contents)",
        stats.imported,
        stats.skipped,
        stats.base_contents
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::find_by_title_region;
    use crate::schema::open_memory;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn imports_rows_and_seeds_base_contents() {
        let conn = open_memory().unwrap();
        let csv = write_csv(
            "Title,Region,Host_Game,Gamepad_Compatibility,Status,Notes\n\
             Super Mario Galaxy 2,USA,Rhythm Heaven Fever [VAKE01],Works,Perfect,\n\
             Mario Kart Wii,PAL,Rhythm Heaven Fever [VAKE01],,Playable,Minor audio issues\n",
        );

        let stats = import_csv(&conn, csv.path()).unwrap();
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.base_contents, 1);

        let record = find_by_title_region(&conn, "Mario Kart Wii", "EUR")
            .unwrap()
            .unwrap();
        assert_eq!(record.base_content, "Rhythm Heaven Fever [VAKE01]");
        assert_eq!(record.notes.as_deref(), Some("Minor audio issues"));
        assert!(record.content_id.is_none());
    }

    #[test]
    fn reimport_updates_in_place() {
        let conn = open_memory().unwrap();
        let first = write_csv(
            "Title,Region,Host_Game,Gamepad_Compatibility,Status,Notes\n\
             Wii Sports,USA,Rhythm Heaven Fever [VAKE01],,Playable,\n",
        );
        let second = write_csv(
            "Title,Region,Host_Game,Gamepad_Compatibility,Status,Notes\n\
             Wii Sports,USA,Rhythm Heaven Fever [VAKE01],Works,Perfect,\n",
        );

        import_csv(&conn, first.path()).unwrap();
        import_csv(&conn, second.path()).unwrap();

        let record = find_by_title_region(&conn, "Wii Sports", "USA")
            .unwrap()
            .unwrap();
        assert_eq!(record.status.as_deref(), Some("Perfect"));
        assert_eq!(record.gamepad_support.as_deref(), Some("Works"));
    }

    #[test]
    fn unknown_region_rows_are_skipped() {
        let conn = open_memory().unwrap();
        let csv = write_csv(
            "Title,Region,Host_Game,Gamepad_Compatibility,Status,Notes\n\
             Mystery Game,XYZ,Rhythm Heaven Fever [VAKE01],,,\n",
        );
        let stats = import_csv(&conn, csv.path()).unwrap();
        assert_eq!(stats.imported, 0);
        assert_eq!(stats.skipped, 1);
    }
}
