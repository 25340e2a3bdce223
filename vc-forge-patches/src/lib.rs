//! Registry of GCT code patches.
//!
//! Patches live as `.gct` files in a directory the user maintains. The
//! filename carries the targeting information:
//!
//! - `RMCE01-cc.gct` — patch of kind `cc` for exactly this title
//! - `RMCE01-cc-widescreen.gct` — same, with a variant label
//! - `RMCE01.gct` — kind defaults to `cc`
//! - `RMCE-cc.gct` — 4-character game code, matches every region
//! - `generic/cc.gct` — last-resort patch for any title
//!
//! Lookup walks from most to least specific: exact id, game code, then
//! generic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use vc_forge_core::ContentId;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How specifically a patch targets a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    /// Full six-character content id.
    ContentId(String),
    /// Four-character game code, any region.
    GameCode(String),
    /// Applies to any title.
    Generic,
}

/// One patch file discovered by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub path: PathBuf,
    pub target: PatchTarget,
    /// Patch kind, e.g. `cc` for Classic Controller forcing.
    pub kind: String,
    pub variant: Option<String>,
}

/// Parse a patch filename stem into target, kind, and variant.
///
/// Returns `None` for names that don't follow the grammar; the scan
/// skips those with a warning rather than failing.
fn parse_stem(stem: &str) -> Option<(PatchTarget, String, Option<String>)> {
    let mut parts = stem.splitn(3, '-');
    let id_part = parts.next()?;
    let target = match id_part.len() {
        6 => PatchTarget::ContentId(id_part.to_ascii_uppercase()),
        4 => PatchTarget::GameCode(id_part.to_ascii_uppercase()),
        _ => return None,
    };
    if !id_part.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let kind = parts.next().unwrap_or("cc").to_string();
    if kind.is_empty() {
        return None;
    }
    let variant = parts.next().map(str::to_string).filter(|v| !v.is_empty());
    Some((target, kind, variant))
}

/// In-memory index over a patch directory.
#[derive(Debug, Default)]
pub struct PatchRegistry {
    by_id: HashMap<(String, String), PatchDescriptor>,
    by_code: HashMap<(String, String), PatchDescriptor>,
    generic: HashMap<String, PatchDescriptor>,
}

impl PatchRegistry {
    /// Scan a directory for `.gct` files. A missing directory yields an
    /// empty registry, since most builds never need a patch.
    pub fn scan(dir: &Path) -> Result<Self, PatchError> {
        let mut registry = Self::default();
        if !dir.exists() {
            return Ok(registry);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "gct") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match parse_stem(stem) {
                Some((target, kind, variant)) => {
                    let descriptor = PatchDescriptor {
                        path: path.clone(),
                        target: target.clone(),
                        kind: kind.clone(),
                        variant,
                    };
                    match target {
                        PatchTarget::ContentId(id) => {
                            registry.by_id.insert((id, kind), descriptor);
                        }
                        PatchTarget::GameCode(code) => {
                            registry.by_code.insert((code, kind), descriptor);
                        }
                        PatchTarget::Generic => {}
                    }
                }
                None => {
                    log::warn!("ignoring patch file with unrecognized name: {}", path.display());
                }
            }
        }

        let generic_dir = dir.join("generic");
        if generic_dir.exists() {
            for entry in std::fs::read_dir(&generic_dir)? {
                let path = entry?.path();
                if path.extension().is_none_or(|e| e != "gct") {
                    continue;
                }
                let Some(kind) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                registry.generic.insert(
                    kind.to_string(),
                    PatchDescriptor {
                        path: path.clone(),
                        target: PatchTarget::Generic,
                        kind: kind.to_string(),
                        variant: None,
                    },
                );
            }
        }

        Ok(registry)
    }

    /// Find the most specific patch of a kind for a title.
    pub fn lookup(&self, content_id: &ContentId, kind: &str) -> Option<&PatchDescriptor> {
        let id_key = (content_id.as_str().to_string(), kind.to_string());
        if let Some(descriptor) = self.by_id.get(&id_key) {
            return Some(descriptor);
        }
        let code_key = (content_id.prefix().to_string(), kind.to_string());
        if let Some(descriptor) = self.by_code.get(&code_key) {
            return Some(descriptor);
        }
        self.generic.get(kind)
    }

    /// Every patch applicable to a title: exact-id matches if any,
    /// else game-code matches, always followed by the generic patches.
    pub fn available(&self, content_id: &ContentId) -> Vec<&PatchDescriptor> {
        let mut hits: Vec<&PatchDescriptor> = self
            .by_id
            .iter()
            .filter(|((id, _), _)| id == content_id.as_str())
            .map(|(_, descriptor)| descriptor)
            .collect();
        if hits.is_empty() {
            hits.extend(
                self.by_code
                    .iter()
                    .filter(|((code, _), _)| code == content_id.prefix())
                    .map(|(_, descriptor)| descriptor),
            );
        }
        hits.extend(self.generic.values());
        hits.sort_by(|a, b| a.path.cmp(&b.path));
        hits
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_code.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every known patch, for listing.
    pub fn all(&self) -> Vec<&PatchDescriptor> {
        self.by_id
            .values()
            .chain(self.by_code.values())
            .chain(self.generic.values())
            .collect()
    }
}
