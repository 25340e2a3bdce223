//! The ten-stage injection pipeline.
//!
//! One run turns a single source image into an installable package
//! under the output directory. Stages are strictly ordered and
//! fail-fast; cancellation is polled between stages only, so a stage
//! that started always finishes.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::time::Duration;
use vc_forge_assets::images::{DRC_FILE, ICON_FILE, TV_FILE};
use vc_forge_core::{IdMinter, probe_file};

use crate::basefiles::{self, BaseTitle};
use crate::cancel::CancelToken;
use crate::error::{BuildError, BuildOutcome};
use crate::job::BuildJob;
use crate::meta::{MetaParams, render_app_xml, render_meta_xml};
use crate::progress::{BuildProgress, BuildStage};
use crate::tools::{DEFAULT_TOOL_TIMEOUT, Tool, ToolKit};
use crate::workspace::BuildWorkspace;

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the private build workspace.
    pub workspace_root: PathBuf,
    /// Read-only directory holding the tool binaries.
    pub tool_repo: PathBuf,
    pub output_dir: PathBuf,
    pub common_key: Option<String>,
    /// Extract only the data partition instead of the whole disc.
    pub trim: bool,
    /// Keep staging/assembly after a run, for debugging.
    pub keep_workspace: bool,
    pub tool_timeout: Duration,
}

impl BuildConfig {
    pub fn new(workspace_root: PathBuf, tool_repo: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            workspace_root,
            tool_repo,
            output_dir,
            common_key: None,
            trim: true,
            keep_workspace: false,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

pub struct PipelineExecutor {
    config: BuildConfig,
    workspace: BuildWorkspace,
    kit: ToolKit,
}

impl PipelineExecutor {
    pub fn new(config: BuildConfig) -> Self {
        let workspace = BuildWorkspace::new(config.workspace_root.clone());
        let kit = ToolKit::new(workspace.tools_dir()).with_timeout(config.tool_timeout);
        Self {
            config,
            workspace,
            kit,
        }
    }

    pub fn workspace(&self) -> &BuildWorkspace {
        &self.workspace
    }

    /// Run every stage for one job.
    pub async fn run(
        &self,
        job: &BuildJob,
        base: &BaseTitle,
        minter: &mut IdMinter,
        progress: &mpsc::UnboundedSender<BuildProgress>,
        cancel: &CancelToken,
    ) -> Result<BuildOutcome, BuildError> {
        let common_key = self
            .config
            .common_key
            .as_deref()
            .ok_or(BuildError::MissingKey)?;

        let header = probe_file(&job.source_path)?;
        let content_id = job.content_id.clone().unwrap_or(header.content_id.clone());
        let title = job
            .display_title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| header.internal_title.clone());
        if title.trim().is_empty() {
            return Err(BuildError::MissingTitle);
        }

        macro_rules! stage {
            ($stage:expr) => {
                if cancel.is_cancelled() {
                    let _ = progress.send(BuildProgress::Cancelled);
                    return Ok(BuildOutcome::Cancelled);
                }
                let _ = progress.send(BuildProgress::StageStarted { stage: $stage });
                log::info!(
                    "[{}/{}] {} — {}",
                    $stage.number(),
                    BuildStage::COUNT,
                    $stage,
                    content_id
                );
            };
        }

        // 1. Workspace init
        stage!(BuildStage::WorkspaceInit);
        self.workspace.prepare()?;
        self.workspace.stage_tools(&self.config.tool_repo)?;
        self.kit.verify()?;

        // 2. Base acquisition
        stage!(BuildStage::BaseAcquisition);
        if basefiles::base_files_satisfied(&self.workspace, base) {
            let _ = progress.send(BuildProgress::Note {
                message: format!("base files for {} already cached", base.title_id),
            });
        }
        basefiles::ensure_base_files(&self.workspace, &self.kit, base, common_key).await?;

        // 3. Base staging
        stage!(BuildStage::BaseStaging);
        basefiles::stage_base(&self.workspace, base)?;

        // 4. Source normalization
        stage!(BuildStage::SourceNormalization);
        let staging = self.workspace.staging();
        let pre_iso = staging.join("pre.iso");
        if header.container.is_compressed() {
            let src = job.source_path.to_string_lossy().into_owned();
            let dest = pre_iso.to_string_lossy().into_owned();
            self.kit
                .run(
                    Tool::Wit,
                    &["copy", "--source", &src, "--dest", &dest, "-I"],
                    &staging,
                )
                .await?;
        } else {
            std::fs::copy(&job.source_path, &pre_iso)?;
        }
        let tree = staging.join("tree");
        self.extract_tree(&pre_iso, &tree, progress).await?;

        // 5. Signing-artifact extraction
        stage!(BuildStage::SigningExtraction);
        self.extract_signing_records(&pre_iso).await?;

        // 6. Metadata synthesis
        stage!(BuildStage::MetadataSynthesis);
        let assembly = self.workspace.assembly();
        let params = MetaParams::new(minter.mint(), &title, header.raw_id_bytes, job.profile)?;
        std::fs::write(assembly.join("code/app.xml"), render_app_xml(&params))?;
        std::fs::write(assembly.join("meta/meta.xml"), render_meta_xml(&params))?;

        // 7. Artwork conversion
        stage!(BuildStage::ArtworkConversion);
        let artwork = job
            .artwork
            .as_ref()
            .ok_or_else(|| BuildError::MissingArtifact("cover art".to_string()))?;
        // The cache derived the textures when the cover was fetched;
        // here they only get staged.
        let meta_dir = assembly.join("meta");
        for (cached, name) in [
            (&artwork.icon, ICON_FILE),
            (&artwork.tv, TV_FILE),
            (&artwork.drc, DRC_FILE),
        ] {
            if !cached.exists() {
                return Err(BuildError::MissingArtifact(format!("texture {name}")));
            }
            std::fs::copy(cached, meta_dir.join(name))?;
        }

        // 8. Controller-profile materialization
        stage!(BuildStage::ProfileMaterialization);
        if let Some(patch) = &job.selected_patch {
            let dol = tree.join("sys/main.dol");
            if !dol.exists() {
                return Err(BuildError::MissingArtifact(format!(
                    "staged executable {}",
                    dol.display()
                )));
            }
            let dol_arg = dol.to_string_lossy().into_owned();
            let patch_arg = patch.path.to_string_lossy().into_owned();
            self.kit
                .run(
                    Tool::Wstrt,
                    &["patch", &dol_arg, "--add-section", &patch_arg],
                    &staging,
                )
                .await?;
            log::info!("applied {} patch from {}", patch.kind, patch.path.display());
        }
        let game_iso = staging.join("game.iso");
        let tree_arg = tree.to_string_lossy().into_owned();
        let game_arg = game_iso.to_string_lossy().into_owned();
        self.kit
            .run(
                Tool::Wit,
                &[
                    "copy", &tree_arg, "--DEST", &game_arg, "-ovv", "--links", "--iso",
                ],
                &staging,
            )
            .await?;
        let flags = job.profile.encoder_flags();

        // 9. Content-format conversion
        stage!(BuildStage::ContentEncoding);
        self.encode_content(&game_iso, &flags).await?;

        // 10. Final packaging
        stage!(BuildStage::Packaging);
        let out_name = format!("{}{}", job.profile.output_prefix(), content_id.as_str());
        let out_dir = self.config.output_dir.join(&out_name);
        std::fs::create_dir_all(&out_dir)?;
        let in_arg = assembly.to_string_lossy().into_owned();
        let out_arg = out_dir.to_string_lossy().into_owned();
        self.kit
            .run(
                Tool::NusPacker,
                &[
                    "-in", &in_arg, "-out", &out_arg, "-encryptKeyWith", common_key,
                ],
                self.workspace.root(),
            )
            .await?;
        if !out_dir.join("title.tmd").exists() {
            return Err(BuildError::MissingArtifact(format!(
                "{}/title.tmd",
                out_name
            )));
        }

        if !self.config.keep_workspace {
            self.workspace.cleanup()?;
        }
        let _ = progress.send(BuildProgress::Completed);
        Ok(BuildOutcome::Completed(out_dir))
    }

    /// Extract the flat image into a file tree. In trim mode only the
    /// data partition is taken; if that fails the whole disc is
    /// extracted instead, so a build never dies on an unusual layout.
    async fn extract_tree(
        &self,
        pre_iso: &Path,
        tree: &Path,
        progress: &mpsc::UnboundedSender<BuildProgress>,
    ) -> Result<(), BuildError> {
        let staging = self.workspace.staging();
        let iso_arg = pre_iso.to_string_lossy().into_owned();
        let tree_arg = tree.to_string_lossy().into_owned();

        if self.config.trim {
            let result = self
                .kit
                .run(
                    Tool::Wit,
                    &[
                        "extract", &iso_arg, "--DEST", &tree_arg, "--psel", "data", "-vv1",
                    ],
                    &staging,
                )
                .await;
            match result {
                Ok(_) => return Ok(()),
                Err(BuildError::Tool { message, .. }) => {
                    log::warn!("data-partition extract failed ({message}), extracting whole disc");
                    let _ = progress.send(BuildProgress::Note {
                        message: "trim failed, extracting the whole disc".to_string(),
                    });
                    if tree.exists() {
                        std::fs::remove_dir_all(tree)?;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        self.kit
            .run(
                Tool::Wit,
                &[
                    "extract", &iso_arg, "--DEST", &tree_arg, "--psel", "WHOLE", "-vv1",
                ],
                &staging,
            )
            .await?;
        Ok(())
    }

    /// Pull `tmd.bin` / `ticket.bin` out of the flat image into
    /// `assembly/code/` as `rvlt.tmd` / `rvlt.tik`. Non-retail images
    /// may not carry them; that only logs.
    async fn extract_signing_records(&self, pre_iso: &Path) -> Result<(), BuildError> {
        let staging = self.workspace.staging();
        let sign_dir = staging.join("sign");
        let iso_arg = pre_iso.to_string_lossy().into_owned();
        let sign_arg = sign_dir.to_string_lossy().into_owned();

        let result = self
            .kit
            .run(
                Tool::Wit,
                &[
                    "extract", &iso_arg, "--psel", "data", "--files", "+tmd.bin", "--files",
                    "+ticket.bin", "--DEST", &sign_arg, "-vv1",
                ],
                &staging,
            )
            .await;
        if let Err(BuildError::Tool { message, .. }) = &result {
            log::warn!("signing-record extraction failed, continuing without: {message}");
            return Ok(());
        }
        result?;

        let code = self.workspace.assembly().join("code");
        for (name, dest) in [("tmd.bin", "rvlt.tmd"), ("ticket.bin", "rvlt.tik")] {
            match find_file(&sign_dir, name)? {
                Some(found) => {
                    std::fs::copy(&found, code.join(dest))?;
                }
                None => {
                    log::warn!("{name} not present in source image");
                }
            }
        }
        Ok(())
    }

    /// Run the encoder inside `assembly/content/` with the image and
    /// its supporting files staged alongside, then clean those up so
    /// only encoded content remains.
    async fn encode_content(&self, game_iso: &Path, flags: &[&'static str]) -> Result<(), BuildError> {
        let assembly = self.workspace.assembly();
        let content = assembly.join("content");

        let staged_iso = content.join("game.iso");
        std::fs::copy(game_iso, &staged_iso)?;
        let mut staged_support = Vec::new();
        for support in basefiles::encoder_support_files(&assembly) {
            let Some(name) = support.file_name() else {
                continue;
            };
            let dest = content.join(name);
            if support.exists() {
                std::fs::copy(&support, &dest)?;
                staged_support.push(dest);
            }
        }

        let result = self.kit.run(Tool::Nfs2Iso2Nfs, flags, &content).await;

        if staged_iso.exists() {
            std::fs::remove_file(&staged_iso)?;
        }
        for path in staged_support {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        result?;

        let produced_nfs = std::fs::read_dir(&content)?.any(|entry| {
            entry
                .ok()
                .is_some_and(|e| e.path().extension().is_some_and(|ext| ext == "nfs"))
        });
        if !produced_nfs {
            return Err(BuildError::MissingArtifact(
                "encoded content (.nfs)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Depth-first search for a file by name.
fn find_file(dir: &Path, name: &str) -> Result<Option<PathBuf>, BuildError> {
    if !dir.exists() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if let Some(found) = find_file(&path, name)? {
                return Ok(Some(found));
            }
        } else if entry.file_name() == name {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
