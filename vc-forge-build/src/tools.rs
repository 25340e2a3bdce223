//! External tool invocation.
//!
//! The pipeline shells out to a small kit of format tools staged from a
//! read-only repository directory: `wit` (image surgery), `wstrt`
//! (executable patching), `nfs2iso2nfs` (content encoding), `nuspacker`
//! (final packaging), and `jnusfetch` (authenticated base-file
//! downloads). Every call carries a wall-clock timeout; a nonzero exit
//! or timeout surfaces as [`BuildError::Tool`] with stderr preserved.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::time::Duration;

use crate::error::BuildError;

/// Default per-invocation timeout. The encoder can legitimately run
/// for many minutes on a dual-layer image.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Wit,
    Wstrt,
    Nfs2Iso2Nfs,
    NusPacker,
    JnusFetch,
}

impl Tool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Wit => "wit",
            Self::Wstrt => "wstrt",
            Self::Nfs2Iso2Nfs => "nfs2iso2nfs",
            Self::NusPacker => "nuspacker",
            Self::JnusFetch => "jnusfetch",
        }
    }
}

/// Locations of the staged tool binaries.
#[derive(Debug, Clone)]
pub struct ToolKit {
    dir: PathBuf,
    timeout: Duration,
}

impl ToolKit {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, tool: Tool) -> PathBuf {
        self.dir.join(tool.binary_name())
    }

    /// Check that every tool binary is present.
    pub fn verify(&self) -> Result<(), BuildError> {
        for tool in [
            Tool::Wit,
            Tool::Wstrt,
            Tool::Nfs2Iso2Nfs,
            Tool::NusPacker,
            Tool::JnusFetch,
        ] {
            let path = self.path(tool);
            if !path.exists() {
                return Err(BuildError::MissingArtifact(format!(
                    "tool binary {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Run one tool to completion, capturing output.
    ///
    /// Returns stdout on success. Nonzero exit and timeout both map to
    /// `BuildError::Tool`, carrying the tool's stderr verbatim so the
    /// user sees exactly what the tool said.
    pub async fn run(
        &self,
        tool: Tool,
        args: &[&str],
        cwd: &Path,
    ) -> Result<String, BuildError> {
        let program = self.path(tool);
        log::debug!(
            "running {} {} (cwd {})",
            program.display(),
            args.join(" "),
            cwd.display()
        );

        let child = tokio::process::Command::new(&program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::Tool {
                tool: tool.binary_name().to_string(),
                message: format!("failed to start: {e}"),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| BuildError::Tool {
                tool: tool.binary_name().to_string(),
                message: format!("failed to run: {e}"),
            })?,
            Err(_) => {
                return Err(BuildError::Tool {
                    tool: tool.binary_name().to_string(),
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::Tool {
                tool: tool.binary_name().to_string(),
                message: if stderr.trim().is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr.trim_end().to_string()
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
