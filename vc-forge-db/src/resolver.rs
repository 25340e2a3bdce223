//! Maps a probed source image to a compatibility record.
//!
//! Resolution prefers an exact content-id match, then falls back to a
//! fuzzy title search restricted to the id's region. Successful title
//! matches are learned: the content id is written back so the next
//! resolution of the same image is exact.

use rusqlite::Connection;
use vc_forge_core::{ContentId, Region};

use crate::matcher::{
    AUTOMATED_MATCH_THRESHOLD, HIGH_CONFIDENCE_THRESHOLD, TITLE_MATCH_THRESHOLD, title_similarity,
};
use crate::operations::{CompatibilityRecord, StoreError, learn_content_id};
use crate::queries::{all_records, find_by_content_id, records_for_region};

/// Base content used when no record recommends one.
pub const DEFAULT_BASE_CONTENT: &str = "Rhythm Heaven Fever [VAKE01]";

/// How a resolution was made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchSource {
    /// The store already knew this content id.
    Exact,
    /// Fuzzy title match at the given similarity ratio.
    TitleSearch { ratio: f64 },
    /// No record matched; the default base content applies.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    /// Base content whose runtime files scaffold the package.
    pub base_content: String,
    pub record: Option<CompatibilityRecord>,
    pub source: MatchSource,
}

/// Resolve a probed image to its compatibility record.
///
/// Title candidates from the image's own region are preferred; a record
/// from another region is only used above the high-confidence threshold,
/// so a common English title never binds a USA image to its EUR row.
pub fn resolve(
    conn: &Connection,
    content_id: &ContentId,
    internal_title: &str,
) -> Result<Resolved, StoreError> {
    if let Some(record) = find_by_content_id(conn, content_id.as_str())? {
        return Ok(Resolved {
            base_content: record.base_content.clone(),
            record: Some(record),
            source: MatchSource::Exact,
        });
    }

    let region = content_id.region();
    let candidates = if region == Region::Unknown {
        all_records(conn)?
    } else {
        records_for_region(conn, region.code())?
    };

    let mut best: Option<(f64, CompatibilityRecord)> = None;
    for record in candidates {
        // Skip rows already bound to a different image.
        if record.content_id.is_some() {
            continue;
        }
        let ratio = title_similarity(internal_title, &record.title);
        if ratio < TITLE_MATCH_THRESHOLD {
            continue;
        }
        if best.as_ref().is_none_or(|(r, _)| ratio > *r) {
            best = Some((ratio, record));
        }
    }

    // Off-region rescue pass, only at high confidence.
    if best.is_none() && region != Region::Unknown {
        for record in all_records(conn)? {
            if record.content_id.is_some() || record.region == region.code() {
                continue;
            }
            let ratio = title_similarity(internal_title, &record.title);
            if ratio < HIGH_CONFIDENCE_THRESHOLD {
                continue;
            }
            if best.as_ref().is_none_or(|(r, _)| ratio > *r) {
                best = Some((ratio, record));
            }
        }
    }

    match best {
        Some((ratio, record)) => {
            if ratio >= AUTOMATED_MATCH_THRESHOLD {
                learn_content_id(conn, &record.title, &record.region, content_id.as_str())?;
            }
            Ok(Resolved {
                base_content: record.base_content.clone(),
                record: Some(record),
                source: MatchSource::TitleSearch { ratio },
            })
        }
        None => {
            log::debug!(
                "no compatibility record for {} ('{}'), using default base",
                content_id.as_str(),
                internal_title
            );
            Ok(Resolved {
                base_content: DEFAULT_BASE_CONTENT.to_string(),
                record: None,
                source: MatchSource::Fallback,
            })
        }
    }
}
