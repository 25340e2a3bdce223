use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no common key configured; set one with the keys command")]
    MissingKey,

    #[error("no title key configured for base content '{0}'")]
    MissingTitleKey(String),

    #[error("job has no display title")]
    MissingTitle,

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("expected artifact missing after stage: {0}")]
    MissingArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Header(#[from] vc_forge_core::HeaderError),

    #[error(transparent)]
    Store(#[from] vc_forge_db::StoreError),

    #[error(transparent)]
    Asset(#[from] vc_forge_assets::AssetError),

    #[error(transparent)]
    Patch(#[from] vc_forge_patches::PatchError),

    #[error("settings error: {0}")]
    Settings(String),
}

/// How a pipeline run ended. Cancellation is a normal outcome, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Package written to the given directory.
    Completed(PathBuf),
    Cancelled,
}
