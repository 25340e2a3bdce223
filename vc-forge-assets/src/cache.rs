//! On-disk artwork cache with a layered fallback chain.
//!
//! Resolution order: the cache itself, then a local artwork directory
//! (for users who keep their own covers), then the remote candidate
//! chain, then an optional flat placeholder. Whatever is found lands in
//! the cache together with the three derived menu textures and a
//! localized-title side file, so a batch re-run never refetches and
//! never re-derives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vc_forge_core::ContentId;

use crate::error::AssetError;
use crate::images::{DRC_FILE, ICON_FILE, TV_FILE, derive_images, placeholder_cover};
use crate::sources::artwork_candidates;
use crate::titledb::TitleIndex;

const COVERS_SUBDIR: &str = "covers";
const DERIVED_SUBDIR: &str = "derived";
const TITLES_SUBDIR: &str = "titles";
const PLACEHOLDERS_SUBDIR: &str = "placeholders";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a resolved cover came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Already present in the cache.
    Cache,
    /// Copied in from the user's local artwork directory.
    LocalRepo,
    /// Downloaded from the given URL.
    Network { url: String },
    /// Generated flat placeholder.
    Placeholder,
}

/// One resolved artwork set, all paths inside the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The raw cover image.
    pub cover: PathBuf,
    /// 128x128 menu icon texture.
    pub icon: PathBuf,
    /// 1280x720 TV banner texture.
    pub tv: PathBuf,
    /// 854x480 GamePad screen texture.
    pub drc: PathBuf,
    /// Localized-title side files, when a title is known.
    pub title_files: Vec<PathBuf>,
    pub source: AssetSource,
    /// English title from the title index or the cached side file.
    pub title: Option<String>,
}

/// Artwork cache rooted at a directory.
pub struct AssetCache {
    root: PathBuf,
    local_repo: Option<PathBuf>,
    use_placeholders: bool,
    index: Option<TitleIndex>,
    http: reqwest::Client,
}

impl AssetCache {
    pub fn new(root: PathBuf) -> Result<Self, AssetError> {
        std::fs::create_dir_all(root.join(COVERS_SUBDIR))?;
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            root,
            local_repo: None,
            use_placeholders: false,
            index: None,
            http,
        })
    }

    /// Check a local artwork directory before the network. Covers there
    /// are named by content id or by the 4-character game code.
    pub fn with_local_repo(mut self, dir: PathBuf) -> Self {
        self.local_repo = Some(dir);
        self
    }

    /// Generate a flat placeholder instead of failing when no artwork
    /// exists anywhere.
    pub fn with_placeholders(mut self, enabled: bool) -> Self {
        self.use_placeholders = enabled;
        self
    }

    /// Attach a title index, enabling alternate-region artwork lookups
    /// and English title resolution.
    pub fn with_index(mut self, index: TitleIndex) -> Self {
        self.index = Some(index);
        self
    }

    fn cover_path(&self, content_id: &ContentId) -> PathBuf {
        self.root
            .join(COVERS_SUBDIR)
            .join(format!("{}.png", content_id.as_str()))
    }

    fn derived_dir(&self, content_id: &ContentId) -> PathBuf {
        self.root.join(DERIVED_SUBDIR).join(content_id.as_str())
    }

    fn title_file(&self, content_id: &ContentId) -> PathBuf {
        self.root
            .join(TITLES_SUBDIR)
            .join(format!("{}.txt", content_id.as_str()))
    }

    fn title_for(&self, content_id: &ContentId) -> Option<String> {
        self.index
            .as_ref()
            .and_then(|idx| idx.get_name(content_id.as_str()))
            .map(str::to_string)
    }

    /// Resolve artwork for a content id: the cover plus the three
    /// derived menu textures and the localized-title side file.
    pub async fn resolve(&self, content_id: &ContentId) -> Result<CacheEntry, AssetError> {
        let dest = self.cover_path(content_id);
        if dest.exists() {
            return self.finish(content_id, dest, AssetSource::Cache);
        }

        if let Some(local) = self.local_cover(content_id)? {
            std::fs::copy(&local, &dest)?;
            log::debug!("cover for {content_id} taken from local repository");
            return self.finish(content_id, dest, AssetSource::LocalRepo);
        }

        let alternates = self.candidate_alternates(content_id);
        let candidates = artwork_candidates(content_id, &alternates);
        let attempts = candidates.len();

        for url in candidates {
            match self.try_download(&url).await {
                Ok(Some(bytes)) => {
                    std::fs::write(&dest, &bytes)?;
                    log::info!("cover for {content_id} downloaded from {url}");
                    return self.finish(content_id, dest, AssetSource::Network { url });
                }
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("artwork fetch failed for {url}: {e}");
                    continue;
                }
            }
        }

        if self.use_placeholders {
            let path = self.placeholder_entry(content_id)?;
            return self.finish(content_id, path, AssetSource::Placeholder);
        }

        Err(AssetError::NotFound {
            content_id: content_id.as_str().to_string(),
            attempts,
        })
    }

    /// Complete an entry: make sure the menu textures and the title
    /// side file sit next to the cover. A cache hit only backfills what
    /// is missing; a freshly fetched cover overwrites stale textures.
    fn finish(
        &self,
        content_id: &ContentId,
        cover: PathBuf,
        source: AssetSource,
    ) -> Result<CacheEntry, AssetError> {
        let derived = self.derived_dir(content_id);
        let icon = derived.join(ICON_FILE);
        let tv = derived.join(TV_FILE);
        let drc = derived.join(DRC_FILE);

        let complete = icon.exists() && tv.exists() && drc.exists();
        if source != AssetSource::Cache || !complete {
            let image = image::open(&cover)?;
            derive_images(&image).write_all(&derived)?;
        }

        let side = self.title_file(content_id);
        let mut title = self.title_for(content_id);
        let mut title_files = Vec::new();
        match &title {
            Some(name) => {
                if !side.exists() {
                    if let Some(parent) = side.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&side, format!("{name}\n"))?;
                }
                title_files.push(side);
            }
            None if side.exists() => {
                title = std::fs::read_to_string(&side)
                    .ok()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
                title_files.push(side);
            }
            None => {}
        }

        Ok(CacheEntry {
            cover,
            icon,
            tv,
            drc,
            title_files,
            source,
            title,
        })
    }

    /// Find a cover in the user's local repository: exact content id
    /// first, then the game-code name, then anything else carrying the
    /// game-code prefix.
    fn local_cover(&self, content_id: &ContentId) -> Result<Option<PathBuf>, AssetError> {
        let Some(repo) = &self.local_repo else {
            return Ok(None);
        };
        let exact = repo.join(format!("{}.png", content_id.as_str()));
        if exact.exists() {
            return Ok(Some(exact));
        }
        let family = repo.join(format!("{}.png", content_id.prefix()));
        if family.exists() {
            return Ok(Some(family));
        }
        if !repo.exists() {
            return Ok(None);
        }
        let mut matches = Vec::new();
        for entry in std::fs::read_dir(repo)? {
            let path = entry?.path();
            let starts = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(content_id.prefix()));
            if starts && path.extension().is_some_and(|e| e == "png") {
                matches.push(path);
            }
        }
        matches.sort();
        Ok(matches.into_iter().next())
    }

    /// Ids worth trying besides the primary: sibling releases under the
    /// same game code, plus any listed id sharing the same title.
    fn candidate_alternates(&self, content_id: &ContentId) -> Vec<String> {
        let Some(index) = &self.index else {
            return Vec::new();
        };
        let mut alternates = index.alternate_ids(content_id);
        if let Some(name) = index.get_name(content_id.as_str()) {
            for id in index.ids_for_name(name) {
                if id != content_id.as_str() && !alternates.iter().any(|a| a == id) {
                    alternates.push(id.to_string());
                }
            }
        }
        alternates
    }

    /// Fetch one candidate URL. Returns `Ok(None)` for a miss (404 or a
    /// body that isn't a decodable image).
    async fn try_download(&self, url: &str) -> Result<Option<Vec<u8>>, AssetError> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let bytes = resp.bytes().await?.to_vec();
        // GameTDB answers some misses with an HTML page, so decode to
        // be sure we got an image.
        if image::load_from_memory(&bytes).is_err() {
            return Ok(None);
        }
        Ok(Some(bytes))
    }

    /// Write a placeholder cover outside the covers directory so a
    /// later run with artwork available will still try the network.
    fn placeholder_entry(&self, content_id: &ContentId) -> Result<PathBuf, AssetError> {
        let dir = self.root.join(PLACEHOLDERS_SUBDIR);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.png", content_id.as_str()));
        if !path.exists() {
            placeholder_cover().save_with_format(&path, image::ImageFormat::Png)?;
        }
        Ok(path)
    }

    /// Drop everything cached: covers, placeholders, derived textures,
    /// and title side files.
    pub fn clear(&self) -> Result<u64, AssetError> {
        let mut removed = 0;
        for subdir in [
            COVERS_SUBDIR,
            PLACEHOLDERS_SUBDIR,
            DERIVED_SUBDIR,
            TITLES_SUBDIR,
        ] {
            removed += remove_tree_files(&self.root.join(subdir))?;
        }
        Ok(removed)
    }

    /// Number of cached covers and their total size in bytes.
    pub fn stats(&self) -> Result<(u64, u64), AssetError> {
        let mut count = 0;
        let mut bytes = 0;
        let dir = self.root.join(COVERS_SUBDIR);
        if dir.exists() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    count += 1;
                    bytes += entry.metadata()?.len();
                }
            }
        }
        Ok((count, bytes))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Remove every file under a directory tree, leaving the root in place.
fn remove_tree_files(dir: &Path) -> Result<u64, AssetError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            removed += remove_tree_files(&path)?;
            std::fs::remove_dir(&path)?;
        } else {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png(path: &Path) {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 0, 0]));
        image::DynamicImage::ImageRgb8(img)
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    fn index() -> TitleIndex {
        TitleIndex::parse(
            "RMCE01 = Mario Kart Wii\n\
             RMCP01 = Mario Kart Wii\n\
             SB4E01 = Super Mario Galaxy 2\n",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn local_repo_hit_lands_in_cache() {
        let cache_dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        sample_png(&repo_dir.path().join("RMCE01.png"));

        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_local_repo(repo_dir.path().to_path_buf());
        let id: ContentId = "RMCE01".parse().unwrap();

        let first = cache.resolve(&id).await.unwrap();
        assert_eq!(first.source, AssetSource::LocalRepo);
        assert!(first.cover.starts_with(cache_dir.path()));

        // Second resolution never leaves the cache.
        let second = cache.resolve(&id).await.unwrap();
        assert_eq!(second.source, AssetSource::Cache);
        assert_eq!(second.cover, first.cover);
    }

    #[tokio::test]
    async fn resolution_derives_textures_and_title_file() {
        let cache_dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        sample_png(&repo_dir.path().join("RMCE01.png"));

        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_local_repo(repo_dir.path().to_path_buf())
            .with_index(index());
        let id: ContentId = "RMCE01".parse().unwrap();
        let entry = cache.resolve(&id).await.unwrap();

        for texture in [&entry.icon, &entry.tv, &entry.drc] {
            assert!(texture.exists(), "{} missing", texture.display());
            assert!(texture.starts_with(cache_dir.path()));
        }
        assert_eq!(entry.title.as_deref(), Some("Mario Kart Wii"));
        assert_eq!(entry.title_files.len(), 1);
        let side = std::fs::read_to_string(&entry.title_files[0]).unwrap();
        assert_eq!(side.trim(), "Mario Kart Wii");
    }

    #[tokio::test]
    async fn cache_hit_backfills_missing_side_files() {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_index(index());
        // A cover cached by an earlier version, with nothing derived.
        sample_png(&cache_dir.path().join("covers/SB4E01.png"));

        let id: ContentId = "SB4E01".parse().unwrap();
        let entry = cache.resolve(&id).await.unwrap();
        assert_eq!(entry.source, AssetSource::Cache);
        assert!(entry.icon.exists());
        assert!(entry.tv.exists());
        assert!(entry.drc.exists());
        assert!(entry.title_files[0].exists());
    }

    #[tokio::test]
    async fn cached_side_file_supplies_the_title_without_an_index() {
        let cache_dir = tempfile::tempdir().unwrap();
        let with_index = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_index(index());
        sample_png(&cache_dir.path().join("covers/SB4E01.png"));
        let id: ContentId = "SB4E01".parse().unwrap();
        with_index.resolve(&id).await.unwrap();

        let bare = AssetCache::new(cache_dir.path().to_path_buf()).unwrap();
        let entry = bare.resolve(&id).await.unwrap();
        assert_eq!(entry.title.as_deref(), Some("Super Mario Galaxy 2"));
    }

    #[tokio::test]
    async fn local_repo_falls_back_to_the_game_code() {
        let cache_dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        sample_png(&repo_dir.path().join("RMCE.png"));

        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_local_repo(repo_dir.path().to_path_buf());
        let id: ContentId = "RMCE01".parse().unwrap();
        let entry = cache.resolve(&id).await.unwrap();
        assert_eq!(entry.source, AssetSource::LocalRepo);
    }

    #[tokio::test]
    async fn local_repo_scans_for_prefixed_covers() {
        let cache_dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        sample_png(&repo_dir.path().join("RMCE01-v2.png"));

        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_local_repo(repo_dir.path().to_path_buf());
        let id: ContentId = "RMCE01".parse().unwrap();
        let entry = cache.resolve(&id).await.unwrap();
        assert_eq!(entry.source, AssetSource::LocalRepo);
    }

    #[test]
    fn title_sharing_ids_join_the_candidates() {
        let cache_dir = tempfile::tempdir().unwrap();
        let shared = TitleIndex::parse(
            "AAAE01 = Twin Release\n\
             BBBP01 = Twin Release\n",
        )
        .unwrap();
        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_index(shared);

        let id: ContentId = "AAAE01".parse().unwrap();
        let alternates = cache.candidate_alternates(&id);
        // BBBP01 shares no game code with AAAE01; only the shared title
        // puts it on the list.
        assert!(alternates.iter().any(|a| a == "BBBP01"));
        assert!(!alternates.iter().any(|a| a == "AAAE01"));
    }

    #[test]
    fn placeholder_is_kept_out_of_the_covers_directory() {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_placeholders(true);
        let id: ContentId = "ZZZZ01".parse().unwrap();

        let path = cache.placeholder_entry(&id).unwrap();
        assert!(path.starts_with(cache_dir.path().join("placeholders")));
        assert!(!cache.cover_path(&id).exists());
    }

    #[tokio::test]
    async fn clear_removes_covers_and_derived_files() {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(cache_dir.path().to_path_buf())
            .unwrap()
            .with_index(index());
        sample_png(&cache_dir.path().join("covers/RMCE01.png"));
        sample_png(&cache_dir.path().join("covers/SB4E01.png"));
        let id: ContentId = "RMCE01".parse().unwrap();
        cache.resolve(&id).await.unwrap();

        assert_eq!(cache.stats().unwrap().0, 2);
        // Two covers, three textures, one title file.
        assert_eq!(cache.clear().unwrap(), 6);
        assert_eq!(cache.stats().unwrap().0, 0);
        assert!(!cache.derived_dir(&id).exists());
    }
}
