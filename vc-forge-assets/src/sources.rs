//! Remote artwork sources and the candidate URL chain.

use vc_forge_core::ContentId;

const GAMETDB_BASE: &str = "https://art.gametdb.com/wii";
const MIRROR_BASE: &str =
    "https://raw.githubusercontent.com/UWUVCI-Prime/UWUVCI-IMAGES/master/wii";

/// Cover variants hosted by GameTDB, best quality first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtKind {
    CoverFullHq,
    Cover,
}

impl ArtKind {
    fn path_segment(&self) -> &'static str {
        match self {
            Self::CoverFullHq => "coverfullHQ",
            Self::Cover => "cover",
        }
    }

    fn all() -> [ArtKind; 2] {
        [Self::CoverFullHq, Self::Cover]
    }
}

fn gametdb_url(kind: ArtKind, language: &str, id: &str) -> String {
    format!("{GAMETDB_BASE}/{}/{language}/{id}.png", kind.path_segment())
}

fn mirror_url(id: &str) -> String {
    format!("{MIRROR_BASE}/{id}.png")
}

/// The full ordered list of artwork URLs to try for a content id.
///
/// For each candidate id (the probed id first, then alternates from the
/// title index) every GameTDB variant is tried across the region's
/// language preference order, then the community mirror. The first URL
/// that answers with an image wins.
pub fn artwork_candidates(content_id: &ContentId, alternates: &[String]) -> Vec<String> {
    let mut ids: Vec<&str> = vec![content_id.as_str()];
    ids.extend(alternates.iter().map(String::as_str));

    let mut urls = Vec::new();
    for id in &ids {
        let region = id
            .parse::<ContentId>()
            .map(|c| c.region())
            .unwrap_or(content_id.region());
        for kind in ArtKind::all() {
            for language in region.artwork_language_order() {
                urls.push(gametdb_url(kind, language, id));
            }
        }
    }
    for id in &ids {
        urls.push(mirror_url(id));
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_quality_own_region_comes_first() {
        let id: ContentId = "RMCE01".parse().unwrap();
        let urls = artwork_candidates(&id, &[]);
        assert_eq!(
            urls[0],
            "https://art.gametdb.com/wii/coverfullHQ/US/RMCE01.png"
        );
        assert_eq!(
            urls.last().map(String::as_str),
            Some("https://raw.githubusercontent.com/UWUVCI-Prime/UWUVCI-IMAGES/master/wii/RMCE01.png")
        );
    }

    #[test]
    fn korean_ids_prefer_korean_artwork() {
        let id: ContentId = "RMCK01".parse().unwrap();
        let urls = artwork_candidates(&id, &[]);
        assert_eq!(
            urls[0],
            "https://art.gametdb.com/wii/coverfullHQ/KO/RMCK01.png"
        );
    }

    #[test]
    fn alternates_follow_the_primary_id() {
        let id: ContentId = "RMCE01".parse().unwrap();
        let urls = artwork_candidates(&id, &["RMCP01".to_string()]);
        let first_alt = urls
            .iter()
            .position(|u| u.contains("RMCP01"))
            .expect("alternate present");
        let last_primary_tdb = urls
            .iter()
            .rposition(|u| u.contains("RMCE01") && u.contains("gametdb"))
            .expect("primary present");
        assert!(first_alt > last_primary_tdb);
        // Alternates use their own region's language order.
        assert!(urls[first_alt].contains("/EN/"));
    }
}
