/// The ten ordered pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    WorkspaceInit,
    BaseAcquisition,
    BaseStaging,
    SourceNormalization,
    SigningExtraction,
    MetadataSynthesis,
    ArtworkConversion,
    ProfileMaterialization,
    ContentEncoding,
    Packaging,
}

impl BuildStage {
    pub const COUNT: usize = 10;

    pub const ALL: [BuildStage; Self::COUNT] = [
        Self::WorkspaceInit,
        Self::BaseAcquisition,
        Self::BaseStaging,
        Self::SourceNormalization,
        Self::SigningExtraction,
        Self::MetadataSynthesis,
        Self::ArtworkConversion,
        Self::ProfileMaterialization,
        Self::ContentEncoding,
        Self::Packaging,
    ];

    /// One-based position, for "stage 4/10" display.
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkspaceInit => "preparing workspace",
            Self::BaseAcquisition => "fetching base files",
            Self::BaseStaging => "staging base content",
            Self::SourceNormalization => "normalizing source image",
            Self::SigningExtraction => "extracting signing records",
            Self::MetadataSynthesis => "writing metadata",
            Self::ArtworkConversion => "converting artwork",
            Self::ProfileMaterialization => "applying controller profile",
            Self::ContentEncoding => "encoding content",
            Self::Packaging => "packaging",
        }
    }

    /// Job-local progress in percent when this stage begins.
    pub fn percent_at_start(&self) -> f64 {
        (self.number().saturating_sub(1)) as f64 * 100.0 / Self::COUNT as f64
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Progress update from a running pipeline.
#[derive(Debug, Clone)]
pub enum BuildProgress {
    StageStarted { stage: BuildStage },
    /// Free-form note inside a stage (tool output highlights).
    Note { message: String },
    Completed,
    Cancelled,
    Failed { message: String },
}

/// Event stream from a batch run.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    JobStarted {
        index: usize,
        title: String,
    },
    JobFinished {
        index: usize,
        status: crate::job::JobStatus,
    },
    /// Overall batch progress, 0.0 to 100.0. Each job contributes an
    /// equal share scaled by its own stage progress.
    Progress {
        percent: f64,
    },
    Done {
        completed: usize,
        failed: usize,
        skipped: usize,
        cancelled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbering_is_dense() {
        for (idx, stage) in BuildStage::ALL.iter().enumerate() {
            assert_eq!(stage.number(), idx + 1);
        }
        assert_eq!(BuildStage::Packaging.number(), BuildStage::COUNT);
    }

    #[test]
    fn percent_at_start_spans_the_run() {
        assert_eq!(BuildStage::WorkspaceInit.percent_at_start(), 0.0);
        assert_eq!(BuildStage::Packaging.percent_at_start(), 90.0);
    }
}
