//! The pipeline's private working directory.
//!
//! Layout under the workspace root:
//! - `staging/`   — scratch space for the current job, wiped every run
//! - `assembly/`  — the package tree being assembled, wiped every run
//! - `tools/`     — staged tool binaries and their config files
//! - `basecache/` — downloaded base content, preserved across runs

use std::path::{Path, PathBuf};

use crate::error::BuildError;

#[derive(Debug, Clone)]
pub struct BuildWorkspace {
    root: PathBuf,
}

impl BuildWorkspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn assembly(&self) -> PathBuf {
        self.root.join("assembly")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    pub fn basecache(&self) -> PathBuf {
        self.root.join("basecache")
    }

    /// Wipe the per-job directories and recreate the skeleton. The
    /// base cache and tool staging survive between runs.
    pub fn prepare(&self) -> Result<(), BuildError> {
        for dir in [self.staging(), self.assembly()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
        }
        std::fs::create_dir_all(self.staging())?;
        for sub in ["code", "content", "meta"] {
            std::fs::create_dir_all(self.assembly().join(sub))?;
        }
        std::fs::create_dir_all(self.tools_dir())?;
        std::fs::create_dir_all(self.basecache())?;
        Ok(())
    }

    /// Remove the per-job directories entirely. Called after a
    /// successful run unless debug retention is on.
    pub fn cleanup(&self) -> Result<(), BuildError> {
        for dir in [self.staging(), self.assembly()] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Copy tool binaries from a read-only repository into `tools/`.
    /// Existing files are overwritten so a repository update takes
    /// effect on the next run.
    pub fn stage_tools(&self, repo: &Path) -> Result<(), BuildError> {
        let dest = self.tools_dir();
        std::fs::create_dir_all(&dest)?;
        for entry in std::fs::read_dir(repo)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let target = dest.join(entry.file_name());
                std::fs::copy(entry.path(), &target)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let mut perms = std::fs::metadata(&target)?.permissions();
                    perms.set_mode(perms.mode() | 0o755);
                    std::fs::set_permissions(&target, perms)?;
                }
            }
        }
        Ok(())
    }
}

/// Recursive directory copy, creating destination directories as
/// needed. Symlinks are followed.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_wipes_staging_but_keeps_basecache() {
        let dir = tempfile::tempdir().unwrap();
        let ws = BuildWorkspace::new(dir.path().to_path_buf());
        ws.prepare().unwrap();

        std::fs::write(ws.staging().join("leftover.iso"), b"x").unwrap();
        std::fs::write(ws.basecache().join("cached.bin"), b"x").unwrap();

        ws.prepare().unwrap();
        assert!(!ws.staging().join("leftover.iso").exists());
        assert!(ws.basecache().join("cached.bin").exists());
        assert!(ws.assembly().join("meta").is_dir());
    }

    #[test]
    fn copy_tree_is_recursive() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("a/b")).unwrap();
        std::fs::write(src.path().join("a/b/file.txt"), b"data").unwrap();

        copy_tree(src.path(), &dst.path().join("out")).unwrap();
        assert_eq!(
            std::fs::read(dst.path().join("out/a/b/file.txt")).unwrap(),
            b"data"
        );
    }
}
