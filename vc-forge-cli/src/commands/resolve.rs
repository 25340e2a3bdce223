use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use vc_forge_core::probe_file;
use vc_forge_db::MatchSource;
use vc_forge_patches::{PatchRegistry, PatchTarget};

use crate::paths;

/// Probe a source image and show the header plus what the store would
/// resolve it to.
pub(crate) fn run_resolve(source: &Path) -> i32 {
    let header = match probe_file(source) {
        Ok(header) => header,
        Err(e) => {
            log::error!("cannot probe {}: {e}", source.display());
            return 1;
        }
    };

    log::info!(
        "{}",
        format!("{}", header.content_id).if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  container: {:?}", header.container);
    log::info!("  region:    {}", header.region());
    log::info!(
        "  title:     {}",
        if header.internal_title.is_empty() {
            "(none)"
        } else {
            &header.internal_title
        }
    );

    let conn = match vc_forge_db::open_database(&paths::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("cannot open compatibility store: {e}");
            return 1;
        }
    };
    match vc_forge_db::resolve(&conn, &header.content_id, &header.internal_title) {
        Ok(resolved) => {
            match resolved.source {
                MatchSource::Exact => log::info!("  match:     exact content id"),
                MatchSource::TitleSearch { ratio } => {
                    log::info!("  match:     title search (similarity {ratio:.2})")
                }
                MatchSource::Fallback => log::info!("  match:     none, default base"),
            }
            log::info!("  base:      {}", resolved.base_content);
            if let Some(record) = resolved.record {
                if let Some(status) = record.status {
                    log::info!("  status:    {status}");
                }
                if let Some(notes) = record.notes {
                    log::info!("  notes:     {notes}");
                }
            }
            show_patches(&header.content_id);
            0
        }
        Err(e) => {
            log::error!("resolution failed: {e}");
            1
        }
    }
}

fn show_patches(content_id: &vc_forge_core::ContentId) {
    let registry = match PatchRegistry::scan(&paths::patch_dir()) {
        Ok(registry) => registry,
        Err(e) => {
            log::warn!("cannot scan patches: {e}");
            return;
        }
    };
    let available = registry.available(content_id);
    if available.is_empty() {
        return;
    }
    log::info!("  patches:");
    for patch in available {
        let scope = match &patch.target {
            PatchTarget::ContentId(_) => "exact",
            PatchTarget::GameCode(_) => "game code",
            PatchTarget::Generic => "generic",
        };
        match &patch.variant {
            Some(variant) => log::info!("    {} ({variant}, {scope})", patch.kind),
            None => log::info!("    {} ({scope})", patch.kind),
        }
    }
}

/// Search stored compatibility records by title substring.
pub(crate) fn run_search(query: &str) -> i32 {
    let conn = match vc_forge_db::open_database(&paths::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("cannot open compatibility store: {e}");
            return 1;
        }
    };
    let records = match vc_forge_db::search_titles(&conn, query) {
        Ok(records) => records,
        Err(e) => {
            log::error!("search failed: {e}");
            return 1;
        }
    };
    if records.is_empty() {
        log::info!("no records match '{query}'");
        return 0;
    }
    for record in &records {
        log::info!(
            "{} [{}] {} {}",
            record.title.as_str().if_supports_color(Stdout, |t| t.bold()),
            record.region,
            record.content_id.as_deref().unwrap_or("------"),
            record.status.as_deref().unwrap_or(""),
        );
    }
    log::info!("{} record(s)", records.len());
    0
}
