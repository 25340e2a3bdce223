use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use vc_forge_build::settings;

use crate::paths;

fn looks_like_key(key: &str) -> bool {
    key.len() == 32 && key.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn run_set_common(key: &str) -> i32 {
    if !looks_like_key(key) {
        log::error!("a key is 32 hexadecimal characters");
        return 1;
    }
    match settings::save_common_key(key) {
        Ok(()) => {
            log::info!(
                "{} common key saved",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            );
            0
        }
        Err(e) => {
            log::error!("cannot save settings: {e}");
            1
        }
    }
}

pub(crate) fn run_set_title(base_code: &str, key: &str) -> i32 {
    if !looks_like_key(key) {
        log::error!("a key is 32 hexadecimal characters");
        return 1;
    }
    match settings::save_title_key(base_code, key) {
        Ok(()) => {
            log::info!(
                "{} title key for {} saved",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                base_code,
            );
            0
        }
        Err(e) => {
            log::error!("cannot save settings: {e}");
            1
        }
    }
}

/// Store a default title key against a base content name, so every
/// record recommending that base resolves without per-code settings.
pub(crate) fn run_set_base(base_content: &str, key: &str) -> i32 {
    if !looks_like_key(key) {
        log::error!("a key is 32 hexadecimal characters");
        return 1;
    }
    let conn = match vc_forge_db::open_database(&paths::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("cannot open compatibility store: {e}");
            return 1;
        }
    };
    match vc_forge_db::set_base_content_key(&conn, base_content, key) {
        Ok(()) => {
            log::info!(
                "{} default key for '{}' saved",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                base_content,
            );
            0
        }
        Err(e) => {
            log::error!("cannot store key: {e}");
            1
        }
    }
}

pub(crate) fn run_show() -> i32 {
    match settings::load_settings_string() {
        Some(contents) => {
            log::info!("{}", settings::settings_path().display());
            for line in contents.lines() {
                log::info!("  {line}");
            }
            0
        }
        None => {
            log::info!(
                "no settings yet at {}",
                settings::settings_path().display()
            );
            0
        }
    }
}
