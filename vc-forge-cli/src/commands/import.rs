use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::paths;

pub(crate) fn run_import(csv: &Path) -> i32 {
    let conn = match vc_forge_db::open_database(&paths::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("cannot open compatibility store: {e}");
            return 1;
        }
    };

    match vc_forge_db::import_csv(&conn, csv) {
        Ok(stats) => {
            log::info!(
                "{} imported {} records ({} skipped, {} base contents)",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                stats.imported,
                stats.skipped,
                stats.base_contents,
            );
            match vc_forge_db::store_stats(&conn) {
                Ok(totals) => {
                    log::info!(
                        "store now holds {} records, {} with learned ids",
                        totals.total,
                        totals.with_content_id,
                    );
                }
                Err(e) => log::warn!("cannot read store stats: {e}"),
            }
            0
        }
        Err(e) => {
            log::error!("import failed: {e}");
            1
        }
    }
}
