use std::path::PathBuf;

use vc_forge_assets::CacheEntry;
use vc_forge_core::{ContentId, ControllerProfile};
use vc_forge_patches::PatchDescriptor;

use crate::basefiles::BaseTitle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One build in a batch: a source image plus everything resolved for it.
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub source_path: PathBuf,
    pub profile: ControllerProfile,
    /// Filled by preparation (header probe).
    pub content_id: Option<ContentId>,
    /// Title shown on the Wii U menu. Resolved from the store or title
    /// index, falling back to the image's internal title.
    pub display_title: Option<String>,
    pub base_content: Option<String>,
    /// Donor title resolved for `base_content`, with its keys.
    pub base_title: Option<BaseTitle>,
    pub artwork: Option<CacheEntry>,
    pub selected_patch: Option<PatchDescriptor>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    /// Set when another job in the batch would write the same output
    /// directory. Conflicted jobs are skipped, first one wins.
    pub output_conflict: bool,
}

impl BuildJob {
    pub fn new(source_path: PathBuf, profile: ControllerProfile) -> Self {
        Self {
            source_path,
            profile,
            content_id: None,
            display_title: None,
            base_content: None,
            base_title: None,
            artwork: None,
            selected_patch: None,
            status: JobStatus::Pending,
            error_message: None,
            output_conflict: false,
        }
    }

    /// Output directory name: profile prefix plus content id.
    pub fn output_name(&self) -> Option<String> {
        self.content_id
            .as_ref()
            .map(|id| format!("{}{}", self.profile.output_prefix(), id.as_str()))
    }

    pub fn is_prepared(&self) -> bool {
        self.content_id.is_some() && self.display_title.is_some()
    }
}
