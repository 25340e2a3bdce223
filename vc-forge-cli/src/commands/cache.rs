use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use vc_forge_assets::{AssetCache, TitleIndex};
use vc_forge_core::ContentId;

use crate::paths;

fn open_cache(placeholders: bool) -> Option<AssetCache> {
    let mut cache = match AssetCache::new(paths::art_cache_dir()) {
        Ok(cache) => cache.with_placeholders(placeholders),
        Err(e) => {
            log::error!("cannot open artwork cache: {e}");
            return None;
        }
    };
    let index_path = paths::title_index_path();
    if index_path.exists() {
        match TitleIndex::load(&index_path) {
            Ok(index) => cache = cache.with_index(index),
            Err(e) => log::warn!("ignoring title index: {e}"),
        }
    }
    Some(cache)
}

pub(crate) async fn run_prefetch(ids: Vec<String>, placeholders: bool) -> i32 {
    let Some(cache) = open_cache(placeholders) else {
        return 1;
    };

    let mut failures = 0;
    for raw in ids {
        let id = match raw.parse::<ContentId>() {
            Ok(id) => id,
            Err(e) => {
                log::warn!("skipping '{raw}': {e}");
                failures += 1;
                continue;
            }
        };
        match cache.resolve(&id).await {
            Ok(entry) => {
                log::info!(
                    "{} {id} ({:?})",
                    "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                    entry.source,
                );
            }
            Err(e) => {
                log::warn!(
                    "{} {id}: {e}",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                );
                failures += 1;
            }
        }
    }
    if failures > 0 { 1 } else { 0 }
}

pub(crate) fn run_stats() -> i32 {
    let Some(cache) = open_cache(false) else {
        return 1;
    };
    match cache.stats() {
        Ok((count, bytes)) => {
            log::info!("{count} cached covers, {} KiB", bytes / 1024);
            log::info!("cache root: {}", cache.root().display());
            0
        }
        Err(e) => {
            log::error!("cannot read cache: {e}");
            1
        }
    }
}

pub(crate) fn run_clear() -> i32 {
    let Some(cache) = open_cache(false) else {
        return 1;
    };
    match cache.clear() {
        Ok(removed) => {
            log::info!(
                "{} removed {removed} cached files",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            );
            0
        }
        Err(e) => {
            log::error!("cannot clear cache: {e}");
            1
        }
    }
}
