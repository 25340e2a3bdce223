//! Base-content acquisition and staging.
//!
//! A package is scaffolded from two sets of platform files: runtime
//! pieces of the vWii system title and the full code/content/meta tree
//! of a donor base title. Both are fetched once per file with the
//! authenticated downloader and kept in `basecache/` forever after.

use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::tools::{Tool, ToolKit};
use crate::workspace::{BuildWorkspace, copy_tree};

/// vWii system title holding the deinterlace table and system font.
pub const VWII_TITLE_ID: &str = "0005001010004000";

pub const VWII_FILES: &[&str] = &["code/deint.txt", "code/font.bin"];

/// Donor title used when the compatibility store has no better
/// recommendation.
pub const DEFAULT_BASE_TITLE_ID: &str = "00050000101b0700";

/// Files taken from the donor base title.
pub const BASE_FILES: &[&str] = &[
    "code/cos.xml",
    "code/frisbiiU.rpx",
    "code/fw.img",
    "code/fw.tmd",
    "code/htk.bin",
    "code/nn_hai_user.rpl",
    "content/assets/shaders/cafe/banner.gsh",
    "content/assets/shaders/cafe/fade.gsh",
    "meta/bootMovie.h264",
    "meta/bootLogoTex.tga",
    "meta/bootSound.btsnd",
];

const CDN_URL: &str = "http://ccs.cdn.wup.shop.nintendo.net/ccs/download";

/// The donor title a job builds on.
#[derive(Debug, Clone)]
pub struct BaseTitle {
    /// Bracketed code from the base-content name, e.g. `VAKE01`.
    pub code: String,
    pub title_id: String,
    pub title_key: String,
}

/// Extract the bracketed content code from a base-content name like
/// `Rhythm Heaven Fever [VAKE01]`.
pub fn base_code(base_content: &str) -> Option<&str> {
    let start = base_content.rfind('[')?;
    let end = base_content.rfind(']')?;
    if end <= start + 1 {
        return None;
    }
    Some(&base_content[start + 1..end])
}

/// Write the downloader's config file: CDN url on the first line, the
/// platform common key on the second.
pub fn write_fetch_config(tools_dir: &Path, common_key: &str) -> Result<(), BuildError> {
    std::fs::write(
        tools_dir.join("config"),
        format!("{CDN_URL}\n{common_key}\n"),
    )?;
    Ok(())
}

fn missing_files(cache: &Path, title_id: &str, files: &[&str]) -> Vec<String> {
    files
        .iter()
        .filter(|f| !cache.join(title_id).join(f).exists())
        .map(|f| f.to_string())
        .collect()
}

/// True when every required base file is already cached; the whole
/// acquisition stage is skipped in that case.
pub fn base_files_satisfied(workspace: &BuildWorkspace, base: &BaseTitle) -> bool {
    let cache = workspace.basecache();
    missing_files(&cache, VWII_TITLE_ID, VWII_FILES).is_empty()
        && missing_files(&cache, &base.title_id, BASE_FILES).is_empty()
}

/// Fetch whatever base files are missing from the cache.
///
/// System files are keyed by the platform id alone; donor-title files
/// additionally need the title key. One downloader run per file, cwd =
/// `basecache/`, which is also where the tool drops its output tree.
pub async fn ensure_base_files(
    workspace: &BuildWorkspace,
    kit: &ToolKit,
    base: &BaseTitle,
    common_key: &str,
) -> Result<(), BuildError> {
    let cache = workspace.basecache();

    let vwii_missing = missing_files(&cache, VWII_TITLE_ID, VWII_FILES);
    let base_missing = missing_files(&cache, &base.title_id, BASE_FILES);
    if vwii_missing.is_empty() && base_missing.is_empty() {
        log::debug!("base cache already satisfied");
        return Ok(());
    }

    write_fetch_config(&workspace.tools_dir(), common_key)?;

    for file in &vwii_missing {
        kit.run(Tool::JnusFetch, &[VWII_TITLE_ID, "-file", file], &cache)
            .await?;
    }
    for file in &base_missing {
        kit.run(
            Tool::JnusFetch,
            &[&base.title_id, &base.title_key, "-file", file],
            &cache,
        )
        .await?;
    }

    // The downloader is expected to leave each file under
    // basecache/<title_id>/<path>; verify before moving on.
    for (title_id, file) in vwii_missing
        .iter()
        .map(|f| (VWII_TITLE_ID, f))
        .chain(base_missing.iter().map(|f| (base.title_id.as_str(), f)))
    {
        let path = cache.join(title_id).join(file);
        if !path.exists() {
            return Err(BuildError::MissingArtifact(format!(
                "base file {}",
                path.display()
            )));
        }
    }

    Ok(())
}

/// Copy the cached base tree into the assembly directory.
pub fn stage_base(workspace: &BuildWorkspace, base: &BaseTitle) -> Result<(), BuildError> {
    let cache = workspace.basecache();
    let assembly = workspace.assembly();

    copy_tree(&cache.join(&base.title_id), &assembly)?;
    for file in VWII_FILES {
        let from = cache.join(VWII_TITLE_ID).join(file);
        let to = assembly.join(file);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&from, &to)?;
    }
    Ok(())
}

/// Paths of the encoder's supporting files inside the staged assembly.
pub fn encoder_support_files(assembly: &Path) -> [PathBuf; 3] {
    [
        assembly.join("code/fw.img"),
        assembly.join("code/deint.txt"),
        assembly.join("code/font.bin"),
    ]
}
