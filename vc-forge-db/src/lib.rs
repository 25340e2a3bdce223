//! SQLite persistence layer for the compatibility store.
//!
//! One table of compatibility records keyed by (title, region), with the
//! content id as a nullable secondary key filled in lazily by the
//! resolver's learning pass. Backed by SQLite (rusqlite, bundled).

pub mod import;
pub mod matcher;
pub mod operations;
pub mod queries;
pub mod resolver;
pub mod schema;

pub use import::{ImportStats, import_csv};
pub use matcher::{
    AUTOMATED_MATCH_THRESHOLD, HIGH_CONFIDENCE_THRESHOLD, TITLE_MATCH_THRESHOLD, normalize_title,
    title_similarity,
};
pub use operations::{
    CompatibilityRecord, StoreError, base_content_key, learn_content_id, set_base_content_key,
    update_localized_titles, update_title, upsert_record,
};
pub use queries::{
    StoreStats, all_records, find_by_content_id, find_by_title_region, records_for_region,
    search_titles, store_stats,
};
pub use resolver::{DEFAULT_BASE_CONTENT, MatchSource, Resolved, resolve};
pub use schema::{open_database, open_memory};
