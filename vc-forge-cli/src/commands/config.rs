use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use vc_forge_build::settings;

pub(crate) fn run_set_output(dir: &Path) -> i32 {
    match settings::save_output_dir(dir) {
        Ok(()) => {
            log::info!(
                "{} output directory set to {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                dir.display(),
            );
            0
        }
        Err(e) => {
            log::error!("cannot save settings: {e}");
            1
        }
    }
}

fn looks_like_title_id(id: &str) -> bool {
    id.len() == 16 && id.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn run_set_base_id(base_code: &str, title_id: &str) -> i32 {
    if !looks_like_title_id(title_id) {
        log::error!("a title id is 16 hexadecimal characters");
        return 1;
    }
    match settings::save_base_title_id(base_code, title_id) {
        Ok(()) => {
            log::info!(
                "{} donor title id for {} set to {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                base_code,
                title_id,
            );
            0
        }
        Err(e) => {
            log::error!("cannot save settings: {e}");
            1
        }
    }
}
