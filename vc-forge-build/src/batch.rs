//! Batch orchestration over many jobs.
//!
//! Preparation (header probing, store resolution, artwork, patch
//! binding) runs concurrently on the prep pool; the builds themselves
//! run strictly one at a time, since they share the wiped workspace.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::mpsc;
use vc_forge_assets::{AssetCache, CacheEntry};
use vc_forge_core::{ControllerProfile, IdMinter, SourceHeader, probe_file};
use vc_forge_db::resolve;
use vc_forge_patches::PatchRegistry;

use crate::basefiles::{BaseTitle, DEFAULT_BASE_TITLE_ID, base_code};
use crate::cancel::CancelToken;
use crate::error::{BuildError, BuildOutcome};
use crate::job::{BuildJob, JobStatus};
use crate::pipeline::PipelineExecutor;
use crate::pool::{DEFAULT_PREP_WORKERS, PrepPool};
use crate::progress::{BatchEvent, BuildProgress};
use crate::settings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

pub struct BatchScheduler {
    jobs: Vec<BuildJob>,
    cancel: CancelToken,
}

type PrepResult = (usize, Result<(SourceHeader, CacheEntry), String>);

impl BatchScheduler {
    pub fn new(jobs: Vec<BuildJob>) -> Self {
        Self {
            jobs,
            cancel: CancelToken::new(),
        }
    }

    pub fn jobs(&self) -> &[BuildJob] {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut Vec<BuildJob> {
        &mut self.jobs
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request a stop. Takes effect at the next stage boundary of the
    /// running job; remaining jobs are left pending.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Concurrently probe headers and fetch artwork for every job that
    /// still needs it, then serially resolve store records and bind
    /// patches. A job whose preparation fails is marked Failed; the
    /// rest of the batch is unaffected.
    pub async fn prepare_all(
        &mut self,
        cache: Arc<AssetCache>,
        conn: &Connection,
        registry: &PatchRegistry,
    ) {
        let pending: Vec<(usize, std::path::PathBuf)> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| !job.is_prepared() && job.status == JobStatus::Pending)
            .map(|(idx, job)| (idx, job.source_path.clone()))
            .collect();
        if pending.is_empty() {
            return;
        }

        let mut pool: PrepPool<PrepResult> =
            PrepPool::start(DEFAULT_PREP_WORKERS, pending, move |(idx, path)| {
                let cache = cache.clone();
                async move {
                    let prepared = async {
                        let header = probe_file(&path).map_err(|e| e.to_string())?;
                        let artwork = cache
                            .resolve(&header.content_id)
                            .await
                            .map_err(|e| e.to_string())?;
                        Ok::<_, String>((header, artwork))
                    }
                    .await;
                    (idx, prepared)
                }
            });

        while let Some((idx, result)) = pool.recv().await {
            match result {
                Ok((header, artwork)) => {
                    let english_title = artwork.title.clone();
                    {
                        let job = &mut self.jobs[idx];
                        job.content_id = Some(header.content_id.clone());
                        job.artwork = Some(artwork);
                    }
                    self.finish_preparation(idx, &header, english_title, conn, registry);
                }
                Err(message) => {
                    let job = &mut self.jobs[idx];
                    log::warn!(
                        "preparation failed for {}: {message}",
                        job.source_path.display()
                    );
                    job.status = JobStatus::Failed;
                    job.error_message = Some(message);
                }
            }
        }
    }

    /// The serial tail of preparation: store resolution, display-title
    /// choice, base-title key lookup, patch binding.
    fn finish_preparation(
        &mut self,
        idx: usize,
        header: &SourceHeader,
        english_title: Option<String>,
        conn: &Connection,
        registry: &PatchRegistry,
    ) {
        let job = &mut self.jobs[idx];
        let Some(content_id) = job.content_id.clone() else {
            return;
        };

        let resolved = match resolve(conn, &content_id, &header.internal_title) {
            Ok(r) => r,
            Err(e) => {
                job.status = JobStatus::Failed;
                job.error_message = Some(e.to_string());
                return;
            }
        };

        // Whatever the artwork source knows the game as is worth
        // keeping; resolution above may just have bound the id.
        if let Some(name) = english_title.as_deref() {
            if let Err(e) =
                vc_forge_db::update_localized_titles(conn, content_id.as_str(), None, Some(name))
            {
                log::warn!("could not record english title for {content_id}: {e}");
            }
        }

        if job.display_title.is_none() {
            job.display_title = resolved
                .record
                .as_ref()
                .map(|r| r.title.clone())
                .or(english_title)
                .or_else(|| {
                    if header.internal_title.is_empty() {
                        None
                    } else {
                        Some(header.internal_title.clone())
                    }
                });
        }
        job.base_content = Some(resolved.base_content.clone());

        match resolve_base(conn, &resolved.base_content) {
            Ok(base) => job.base_title = Some(base),
            Err(e) => {
                job.status = JobStatus::Failed;
                job.error_message = Some(e.to_string());
                return;
            }
        }

        if let Some(kind) = job.profile.patch_kind() {
            match registry.lookup(&content_id, kind) {
                Some(descriptor) => job.selected_patch = Some(descriptor.clone()),
                None => {
                    job.status = JobStatus::Failed;
                    job.error_message = Some(format!(
                        "profile {} requires a '{kind}' patch but none matches {}",
                        job.profile.name(),
                        content_id
                    ));
                }
            }
        }
    }

    /// Mark output collisions. Two jobs collide when they would write
    /// the same output directory, i.e. share (profile, content id).
    /// The first-added job keeps the slot; every later one is skipped.
    pub fn detect_conflicts(&mut self) -> usize {
        let mut seen: HashSet<(ControllerProfile, String)> = HashSet::new();
        let mut conflicts = 0;
        for job in &mut self.jobs {
            let Some(id) = job.content_id.as_ref() else {
                continue;
            };
            let key = (job.profile, id.as_str().to_string());
            if seen.contains(&key) {
                job.output_conflict = true;
                job.status = JobStatus::Skipped;
                conflicts += 1;
            } else {
                seen.insert(key);
            }
        }
        conflicts
    }

    /// Run the prepared jobs through the executor, one at a time.
    ///
    /// Batch progress gives each job an equal share of 100%, scaled by
    /// the job's own stage progress.
    pub async fn run(
        &mut self,
        executor: &PipelineExecutor,
        minter: &mut IdMinter,
        events: &mpsc::UnboundedSender<BatchEvent>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = self.jobs.len().max(1);

        for idx in 0..self.jobs.len() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match self.jobs[idx].status {
                JobStatus::Skipped => {
                    summary.skipped += 1;
                    continue;
                }
                JobStatus::Failed => {
                    summary.failed += 1;
                    continue;
                }
                JobStatus::Completed => continue,
                JobStatus::Pending | JobStatus::Processing => {}
            }

            let title = self.jobs[idx]
                .display_title
                .clone()
                .unwrap_or_else(|| self.jobs[idx].source_path.display().to_string());
            self.jobs[idx].status = JobStatus::Processing;
            let _ = events.send(BatchEvent::JobStarted { index: idx, title });

            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<BuildProgress>();
            let forward = events.clone();
            let base_percent = idx as f64 * 100.0 / total as f64;
            let share = 100.0 / total as f64;
            let forwarder = tokio::spawn(async move {
                while let Some(update) = progress_rx.recv().await {
                    match update {
                        BuildProgress::StageStarted { stage } => {
                            let percent = base_percent + stage.percent_at_start() * share / 100.0;
                            let _ = forward.send(BatchEvent::Progress { percent });
                        }
                        BuildProgress::Note { message } => log::info!("{message}"),
                        _ => {}
                    }
                }
            });

            let base = self.jobs[idx].base_title.clone();
            let outcome = match base {
                Some(base) => {
                    executor
                        .run(&self.jobs[idx], &base, minter, &progress_tx, &self.cancel)
                        .await
                }
                None => Err(BuildError::MissingArtifact(
                    "resolved base title".to_string(),
                )),
            };
            drop(progress_tx);
            let _ = forwarder.await;

            match outcome {
                Ok(BuildOutcome::Completed(path)) => {
                    log::info!("package written to {}", path.display());
                    self.jobs[idx].status = JobStatus::Completed;
                    summary.completed += 1;
                }
                Ok(BuildOutcome::Cancelled) => {
                    // Left pending so a later run can retry it.
                    self.jobs[idx].status = JobStatus::Pending;
                    summary.cancelled = true;
                }
                Err(e) => {
                    log::error!("build failed for {}: {e}", self.jobs[idx].source_path.display());
                    self.jobs[idx].status = JobStatus::Failed;
                    self.jobs[idx].error_message = Some(e.to_string());
                    summary.failed += 1;
                }
            }

            let _ = events.send(BatchEvent::JobFinished {
                index: idx,
                status: self.jobs[idx].status,
            });
            let _ = events.send(BatchEvent::Progress {
                percent: (idx + 1) as f64 * 100.0 / total as f64,
            });

            if summary.cancelled {
                break;
            }
        }

        let _ = events.send(BatchEvent::Done {
            completed: summary.completed,
            failed: summary.failed,
            skipped: summary.skipped,
            cancelled: summary.cancelled,
        });
        summary
    }
}

/// Resolve the donor title and its keys for a base-content name.
///
/// The title id comes from settings (`[base_ids]`) or the built-in
/// default donor; the title key from settings (`[title_keys]`) or the
/// compatibility store.
pub fn resolve_base(conn: &Connection, base_content: &str) -> Result<BaseTitle, BuildError> {
    let code = base_code(base_content)
        .ok_or_else(|| BuildError::Settings(format!("base content '{base_content}' carries no [code]")))?
        .to_string();

    let title_id = settings::load_base_title_id(&code)
        .unwrap_or_else(|| DEFAULT_BASE_TITLE_ID.to_string());

    let title_key = match settings::load_title_key(&code) {
        Some(key) => key,
        None => vc_forge_db::base_content_key(conn, base_content)?
            .ok_or_else(|| BuildError::MissingTitleKey(base_content.to_string()))?,
    };

    Ok(BaseTitle {
        code,
        title_id,
        title_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vc_forge_assets::TitleIndex;
    use vc_forge_core::ContentId;
    use vc_forge_db::CompatibilityRecord;

    fn job_with(profile: ControllerProfile, id: &str) -> BuildJob {
        let mut job = BuildJob::new(PathBuf::from(format!("/tmp/{id}.iso")), profile);
        job.content_id = Some(id.parse::<ContentId>().unwrap());
        job.display_title = Some(id.to_string());
        job
    }

    #[test]
    fn first_job_keeps_the_output_slot() {
        let mut scheduler = BatchScheduler::new(vec![
            job_with(ControllerProfile::GamepadCc, "RMCE01"),
            job_with(ControllerProfile::GamepadCc, "RMCE01"),
            job_with(ControllerProfile::GamepadCc, "RMCE01"),
        ]);
        assert_eq!(scheduler.detect_conflicts(), 2);

        assert!(!scheduler.jobs()[0].output_conflict);
        assert_eq!(scheduler.jobs()[0].status, JobStatus::Pending);
        for job in &scheduler.jobs()[1..] {
            assert!(job.output_conflict);
            assert_eq!(job.status, JobStatus::Skipped);
        }
    }

    #[test]
    fn different_profiles_do_not_conflict() {
        let mut scheduler = BatchScheduler::new(vec![
            job_with(ControllerProfile::GamepadCc, "RMCE01"),
            job_with(ControllerProfile::NoGamepad, "RMCE01"),
            job_with(ControllerProfile::GamepadCc, "SB4E01"),
        ]);
        assert_eq!(scheduler.detect_conflicts(), 0);
    }

    #[test]
    fn patch_choice_does_not_affect_the_conflict_key() {
        let mut first = job_with(ControllerProfile::ForceClassicController, "RMCE01");
        first.selected_patch = None;
        let mut second = job_with(ControllerProfile::ForceClassicController, "RMCE01");
        second.selected_patch = Some(vc_forge_patches::PatchDescriptor {
            path: PathBuf::from("/patches/RMCE01-cc-widescreen.gct"),
            target: vc_forge_patches::PatchTarget::ContentId("RMCE01".to_string()),
            kind: "cc".to_string(),
            variant: Some("widescreen".to_string()),
        });

        let mut scheduler = BatchScheduler::new(vec![first, second]);
        assert_eq!(scheduler.detect_conflicts(), 1);
    }

    #[tokio::test]
    async fn preparation_records_the_english_title() {
        let dir = tempfile::tempdir().unwrap();
        let iso = dir.path().join("source.iso");
        let mut data = vec![0u8; 0x100];
        data[..6].copy_from_slice(b"RMCE01");
        data[0x20..0x20 + 14].copy_from_slice(b"MARIO KART WII");
        std::fs::write(&iso, data).unwrap();

        let repo = dir.path().join("art");
        std::fs::create_dir_all(&repo).unwrap();
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        image::DynamicImage::ImageRgb8(img)
            .save_with_format(repo.join("RMCE01.png"), image::ImageFormat::Png)
            .unwrap();

        let cache = AssetCache::new(dir.path().join("cache"))
            .unwrap()
            .with_local_repo(repo)
            .with_index(TitleIndex::parse("RMCE01 = Mario Kart Wii").unwrap());

        let conn = vc_forge_db::open_memory().unwrap();
        vc_forge_db::upsert_record(
            &conn,
            &CompatibilityRecord {
                title: "Mario Kart Wii".to_string(),
                region: "USA".to_string(),
                content_id: Some("RMCE01".to_string()),
                base_content: "Rhythm Heaven Fever [VAKE01]".to_string(),
                gamepad_support: None,
                status: None,
                notes: None,
                title_local: None,
                title_en: None,
            },
        )
        .unwrap();
        // The title key comes out of the store when settings carry none.
        vc_forge_db::set_base_content_key(&conn, "Rhythm Heaven Fever [VAKE01]", &"f".repeat(32))
            .unwrap();

        let registry =
            PatchRegistry::scan(std::path::Path::new("/nonexistent/patches")).unwrap();
        let mut scheduler = BatchScheduler::new(vec![BuildJob::new(
            iso,
            ControllerProfile::GamepadCc,
        )]);
        scheduler.prepare_all(Arc::new(cache), &conn, &registry).await;

        assert_eq!(scheduler.jobs()[0].status, JobStatus::Pending);
        assert!(scheduler.jobs()[0].base_title.is_some());
        let record = vc_forge_db::find_by_content_id(&conn, "RMCE01")
            .unwrap()
            .unwrap();
        assert_eq!(record.title_en.as_deref(), Some("Mario Kart Wii"));
    }
}
