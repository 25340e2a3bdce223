//! Parser for the GameTDB title list (`wiitdb.txt`).
//!
//! The list is one `ID = Title` pair per line, sorted by id. It maps
//! content ids to English titles and, going the other way, lets the
//! artwork fetcher discover sibling releases of the same game in other
//! regions.

use std::path::Path;

use vc_forge_core::{ContentId, Region};

use crate::error::AssetError;

/// In-memory index over the GameTDB title list.
///
/// Entries are kept sorted by id so prefix scans can binary-search to
/// the first match and stop at the first non-match.
#[derive(Debug, Default)]
pub struct TitleIndex {
    entries: Vec<(String, String)>,
}

impl TitleIndex {
    /// Parse a title list file.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse title list text. Lines without ` = ` are rejected, except
    /// blank lines and the `TITLES = ` header some dumps carry.
    pub fn parse(text: &str) -> Result<Self, AssetError> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((id, title)) = line.split_once(" = ") else {
                return Err(AssetError::IndexParse {
                    line: idx + 1,
                    message: format!("expected 'ID = Title', got '{line}'"),
                });
            };
            let id = id.trim();
            if id.eq_ignore_ascii_case("TITLES") {
                continue;
            }
            entries.push((id.to_string(), title.trim().to_string()));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// English title for an id, if listed.
    pub fn get_name(&self, id: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|(e, _)| e.as_str().cmp(id))
            .ok()
            .map(|idx| self.entries[idx].1.as_str())
    }

    /// All ids whose title matches exactly (case-insensitive).
    pub fn ids_for_name(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, title)| title.eq_ignore_ascii_case(name))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// All ids starting with a prefix. Scans forward from the first
    /// match in the sorted list and stops at the first miss.
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<&str> {
        let start = self
            .entries
            .partition_point(|(id, _)| id.as_str() < prefix);
        self.entries[start..]
            .iter()
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Sibling releases of a content id: same 4-character game code,
    /// different region character. The original id is not included.
    pub fn alternate_ids(&self, content_id: &ContentId) -> Vec<String> {
        let prefix = content_id.prefix();
        let mut alternates = Vec::new();

        // Known region characters first.
        for &ch in Region::all_id_chars() {
            if ch == content_id.region_char() {
                continue;
            }
            let candidate = content_id.with_region_char(ch);
            if self.get_name(candidate.as_str()).is_some() {
                alternates.push(candidate.as_str().to_string());
            }
        }

        // Then anything else the list knows under the same game code.
        for id in self.ids_with_prefix(prefix) {
            if id != content_id.as_str() && !alternates.iter().any(|a| a == id) {
                alternates.push(id.to_string());
            }
        }

        alternates
    }
}
