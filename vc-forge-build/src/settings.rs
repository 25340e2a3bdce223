//! Shared settings file (`~/.config/vc-forge/settings.toml`).
//!
//! Holds the platform common key, per-base-content title keys, and the
//! output directory. Updates are surgical `toml::Value` edits so keys
//! written by other versions or by hand survive a save.

use std::io;
use std::path::{Path, PathBuf};

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("vc-forge").join("settings.toml")
}

fn load_doc(path: &Path) -> toml::Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.parse().ok())
        .unwrap_or_else(|| toml::Value::Table(Default::default()))
}

/// Apply one edit to the settings file and write it back atomically.
fn update_settings<F>(path: &Path, edit: F) -> io::Result<()>
where
    F: FnOnce(&mut toml::value::Table),
{
    let mut doc = load_doc(path);
    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings root is not a table"))?;
    edit(table);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn section_str(doc: &toml::Value, section: &str, key: &str) -> Option<String> {
    let value = doc.get(section)?.get(key)?.as_str()?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn set_section_str(table: &mut toml::value::Table, section: &str, key: &str, value: &str) {
    let entry = table
        .entry(section.to_string())
        .or_insert_with(|| toml::Value::Table(Default::default()));
    if let Some(inner) = entry.as_table_mut() {
        inner.insert(key.to_string(), toml::Value::String(value.to_string()));
    }
}

/// Platform common key, `[keys] common`.
pub fn load_common_key_from(path: &Path) -> Option<String> {
    section_str(&load_doc(path), "keys", "common")
}

pub fn load_common_key() -> Option<String> {
    load_common_key_from(&settings_path())
}

pub fn save_common_key_to(path: &Path, key: &str) -> io::Result<()> {
    update_settings(path, |table| set_section_str(table, "keys", "common", key))
}

pub fn save_common_key(key: &str) -> io::Result<()> {
    save_common_key_to(&settings_path(), key)
}

/// Title key for one base content, `[title_keys] <code>`.
pub fn load_title_key_from(path: &Path, base_code: &str) -> Option<String> {
    section_str(&load_doc(path), "title_keys", base_code)
}

pub fn load_title_key(base_code: &str) -> Option<String> {
    load_title_key_from(&settings_path(), base_code)
}

pub fn save_title_key_to(path: &Path, base_code: &str, key: &str) -> io::Result<()> {
    update_settings(path, |table| {
        set_section_str(table, "title_keys", base_code, key)
    })
}

pub fn save_title_key(base_code: &str, key: &str) -> io::Result<()> {
    save_title_key_to(&settings_path(), base_code, key)
}

/// Wii U title id override for one base content, `[base_ids] <code>`.
/// Only needed for donors other than the built-in default.
pub fn load_base_title_id_from(path: &Path, base_code: &str) -> Option<String> {
    section_str(&load_doc(path), "base_ids", base_code)
}

pub fn load_base_title_id(base_code: &str) -> Option<String> {
    load_base_title_id_from(&settings_path(), base_code)
}

pub fn save_base_title_id_to(path: &Path, base_code: &str, title_id: &str) -> io::Result<()> {
    update_settings(path, |table| {
        set_section_str(table, "base_ids", base_code, title_id)
    })
}

pub fn save_base_title_id(base_code: &str, title_id: &str) -> io::Result<()> {
    save_base_title_id_to(&settings_path(), base_code, title_id)
}

/// Resolve the output directory: CLI override, then `[output] dir`,
/// then `./output`.
pub fn resolve_output_dir(cli_override: Option<PathBuf>) -> PathBuf {
    if let Some(p) = cli_override {
        return p;
    }
    if let Some(p) = section_str(&load_doc(&settings_path()), "output", "dir") {
        return PathBuf::from(p);
    }
    PathBuf::from("output")
}

pub fn save_output_dir_to(path: &Path, dir: &Path) -> io::Result<()> {
    update_settings(path, |table| {
        set_section_str(table, "output", "dir", &dir.to_string_lossy())
    })
}

pub fn save_output_dir(dir: &Path) -> io::Result<()> {
    save_output_dir_to(&settings_path(), dir)
}

/// Load the full settings file as pretty TOML for display.
pub fn load_settings_string() -> Option<String> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}
