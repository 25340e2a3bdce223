use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio::sync::mpsc;
use vc_forge_assets::{AssetCache, TitleIndex};
use vc_forge_build::{
    BatchEvent, BatchScheduler, BuildConfig, BuildJob, PipelineExecutor, settings,
};
use vc_forge_core::IdMinter;
use vc_forge_patches::PatchRegistry;

use crate::BuildArgs;
use crate::paths;

/// Source image extensions picked up by batch scans.
const SOURCE_EXTENSIONS: [&str; 3] = ["iso", "wbfs", "nfs"];

pub(crate) async fn run_build(source: PathBuf, title: Option<String>, args: BuildArgs) -> i32 {
    let mut job = BuildJob::new(source, args.profile);
    job.display_title = title;
    run_jobs(vec![job], &args).await
}

pub(crate) async fn run_batch(dir: PathBuf, args: BuildArgs) -> i32 {
    let jobs = match scan_sources(&dir) {
        Ok(jobs) => jobs
            .into_iter()
            .map(|path| BuildJob::new(path, args.profile))
            .collect::<Vec<_>>(),
        Err(e) => {
            log::error!("cannot scan {}: {e}", dir.display());
            return 1;
        }
    };
    if jobs.is_empty() {
        log::warn!("no source images found under {}", dir.display());
        return 1;
    }
    log::info!("found {} source images", jobs.len());
    run_jobs(jobs, &args).await
}

fn scan_sources(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                SOURCE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if matches {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

async fn run_jobs(jobs: Vec<BuildJob>, args: &BuildArgs) -> i32 {
    let conn = match vc_forge_db::open_database(&paths::database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("cannot open compatibility store: {e}");
            return 1;
        }
    };

    let cache = match build_asset_cache(args) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            log::error!("cannot open artwork cache: {e}");
            return 1;
        }
    };

    let patch_dir = args.patches.clone().unwrap_or_else(paths::patch_dir);
    let registry = match PatchRegistry::scan(&patch_dir) {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("cannot scan patches in {}: {e}", patch_dir.display());
            return 1;
        }
    };

    let mut config = BuildConfig::new(
        paths::workspace_dir(),
        args.tools.clone().unwrap_or_else(paths::tool_repo_dir),
        settings::resolve_output_dir(args.output.clone()),
    );
    config.common_key = settings::load_common_key();
    config.trim = !args.no_trim;
    config.keep_workspace = args.keep_workspace;

    let total = jobs.len();
    let mut scheduler = BatchScheduler::new(jobs);
    log::info!("preparing {total} job(s)...");
    scheduler.prepare_all(cache, &conn, &registry).await;
    let conflicts = scheduler.detect_conflicts();
    if conflicts > 0 {
        log::warn!("{conflicts} job(s) skipped: duplicate (profile, content id)");
    }

    for job in scheduler.jobs() {
        if let Some(message) = &job.error_message {
            log::warn!(
                "{} {}: {message}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                job.source_path.display(),
            );
        }
    }

    let executor = PipelineExecutor::new(config);
    let mut minter = IdMinter::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let display = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                BatchEvent::JobStarted { title, .. } => bar.set_message(title),
                BatchEvent::Progress { percent } => bar.set_position(percent.round() as u64),
                BatchEvent::JobFinished { .. } => {}
                BatchEvent::Done { .. } => bar.finish_and_clear(),
            }
        }
    });

    let summary = scheduler.run(&executor, &mut minter, &events_tx).await;
    drop(events_tx);
    let _ = display.await;

    for job in scheduler.jobs() {
        let mark = match job.status {
            vc_forge_build::JobStatus::Completed => {
                format!("{}", "\u{2714}".if_supports_color(Stdout, |t| t.green()))
            }
            vc_forge_build::JobStatus::Skipped => {
                format!("{}", "-".if_supports_color(Stdout, |t| t.dimmed()))
            }
            _ => format!("{}", "\u{2718}".if_supports_color(Stdout, |t| t.red())),
        };
        log::info!(
            "{mark} {} [{}]",
            job.display_title.as_deref().unwrap_or("?"),
            job.output_name().unwrap_or_else(|| "?".to_string()),
        );
    }
    log::info!(
        "{} completed, {} failed, {} skipped{}",
        summary.completed,
        summary.failed,
        summary.skipped,
        if summary.cancelled { " (cancelled)" } else { "" },
    );

    if summary.cancelled || summary.failed > 0 {
        1
    } else {
        0
    }
}

fn build_asset_cache(args: &BuildArgs) -> Result<AssetCache, vc_forge_assets::AssetError> {
    let mut cache =
        AssetCache::new(paths::art_cache_dir())?.with_placeholders(args.placeholders);
    if let Some(repo) = &args.art_repo {
        cache = cache.with_local_repo(repo.clone());
    }
    let index_path = paths::title_index_path();
    if index_path.exists() {
        match TitleIndex::load(&index_path) {
            Ok(index) => cache = cache.with_index(index),
            Err(e) => log::warn!("ignoring title index: {e}"),
        }
    }
    Ok(cache)
}
