//! Default on-disk locations for application data.

use std::path::PathBuf;

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vc-forge")
}

/// Compatibility store database.
pub fn database_path() -> PathBuf {
    data_dir().join("compat.db")
}

/// Artwork cache root.
pub fn art_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vc-forge")
        .join("art")
}

/// Private build workspace.
pub fn workspace_dir() -> PathBuf {
    data_dir().join("workspace")
}

/// Default tool-binary repository.
pub fn tool_repo_dir() -> PathBuf {
    data_dir().join("tools")
}

/// Default patch directory.
pub fn patch_dir() -> PathBuf {
    data_dir().join("patches")
}

/// Optional GameTDB title list, if the user dropped one in.
pub fn title_index_path() -> PathBuf {
    data_dir().join("wiitdb.txt")
}
