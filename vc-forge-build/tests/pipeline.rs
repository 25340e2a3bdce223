//! End-to-end pipeline runs against stub tool binaries.
//!
//! Each stub is a small shell script that produces the artifacts the
//! real tool would, so the whole stage sequence can run offline.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use vc_forge_assets::images::{DRC_FILE, ICON_FILE, TV_FILE};
use vc_forge_assets::{AssetSource, CacheEntry, derive_images};
use vc_forge_build::basefiles::{BaseTitle, DEFAULT_BASE_TITLE_ID};
use vc_forge_build::{
    BuildConfig, BuildError, BuildJob, BuildOutcome, BuildProgress, BuildStage, CancelToken,
    PipelineExecutor,
};
use vc_forge_core::{ContentId, ControllerProfile, IdMinter};
use vc_forge_patches::PatchRegistry;

fn write_script(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
}

/// Stub kit: every tool creates the artifacts the pipeline checks for.
fn stub_tool_repo(dir: &Path, encoder_extra: &str) {
    write_script(
        dir,
        "wit",
        r#"cmd=$1
dest=""
files=0
prev=""
for a in "$@"; do
  case "$prev" in --dest|--DEST) dest=$a;; esac
  [ "$a" = "--files" ] && files=1
  prev=$a
done
if [ "$cmd" = "extract" ]; then
  mkdir -p "$dest/sys"
  : > "$dest/sys/main.dol"
  if [ $files -eq 1 ]; then : > "$dest/tmd.bin"; : > "$dest/ticket.bin"; fi
else
  : > "$dest"
fi"#,
    );
    write_script(dir, "wstrt", "exit 0");
    write_script(
        dir,
        "nfs2iso2nfs",
        &format!("{encoder_extra}\n: > hif_000000.nfs"),
    );
    write_script(
        dir,
        "nuspacker",
        r#"prev=""
out=""
for a in "$@"; do [ "$prev" = "-out" ] && out=$a; prev=$a; done
mkdir -p "$out"
: > "$out/title.tmd""#,
    );
    write_script(
        dir,
        "jnusfetch",
        r#"tid=$1
prev=""
f=""
for a in "$@"; do [ "$prev" = "-file" ] && f=$a; prev=$a; done
mkdir -p "$PWD/$tid/$(dirname "$f")"
: > "$PWD/$tid/$f""#,
    );
}

fn sample_iso(path: &Path, id: &str, title: &str) {
    let mut data = vec![0u8; 0x100];
    data[..id.len()].copy_from_slice(id.as_bytes());
    data[0x20..0x20 + title.len()].copy_from_slice(title.as_bytes());
    std::fs::write(path, data).unwrap();
}

fn sample_cover(path: &Path) {
    let img = image::RgbImage::from_pixel(160, 224, image::Rgb([40, 90, 160]));
    image::DynamicImage::ImageRgb8(img)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// A cache entry the way `AssetCache::resolve` would hand it out: the
/// cover plus its three derived textures.
fn cached_artwork(derived_dir: &Path, cover: &Path) -> CacheEntry {
    let img = image::open(cover).unwrap();
    derive_images(&img).write_all(derived_dir).unwrap();
    CacheEntry {
        cover: cover.to_path_buf(),
        icon: derived_dir.join(ICON_FILE),
        tv: derived_dir.join(TV_FILE),
        drc: derived_dir.join(DRC_FILE),
        title_files: Vec::new(),
        source: AssetSource::Cache,
        title: None,
    }
}

struct Fixture {
    _root: tempfile::TempDir,
    config: BuildConfig,
    iso: PathBuf,
    cover: PathBuf,
    derived: PathBuf,
    patches: PathBuf,
}

fn fixture(encoder_extra: &str) -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let tool_repo = root.path().join("toolrepo");
    std::fs::create_dir_all(&tool_repo).unwrap();
    stub_tool_repo(&tool_repo, encoder_extra);

    let iso = root.path().join("source.iso");
    sample_iso(&iso, "RMCE01", "MARIO KART WII");
    let cover = root.path().join("cover.png");
    sample_cover(&cover);
    let derived = root.path().join("derived");
    let patches = root.path().join("patches");
    std::fs::create_dir_all(&patches).unwrap();

    let mut config = BuildConfig::new(
        root.path().join("workspace"),
        tool_repo,
        root.path().join("output"),
    );
    config.common_key = Some("00112233445566778899aabbccddeeff".to_string());
    config.tool_timeout = tokio::time::Duration::from_secs(60);

    Fixture {
        _root: root,
        config,
        iso,
        cover,
        derived,
        patches,
    }
}

fn base_title() -> BaseTitle {
    BaseTitle {
        code: "VAKE01".to_string(),
        title_id: DEFAULT_BASE_TITLE_ID.to_string(),
        title_key: "f".repeat(32),
    }
}

fn job_for(fixture: &Fixture, profile: ControllerProfile) -> BuildJob {
    let mut job = BuildJob::new(fixture.iso.clone(), profile);
    job.content_id = Some("RMCE01".parse::<ContentId>().unwrap());
    job.display_title = Some("Mario Kart Wii".to_string());
    job.artwork = Some(cached_artwork(&fixture.derived, &fixture.cover));
    job.base_title = Some(base_title());
    job
}

#[tokio::test]
async fn forced_classic_controller_build_end_to_end() {
    let fixture = fixture("");
    std::fs::write(fixture.patches.join("RMCE-cc.gct"), b"\0GCT").unwrap();
    let registry = PatchRegistry::scan(&fixture.patches).unwrap();

    let mut job = job_for(&fixture, ControllerProfile::ForceClassicController);
    let id = job.content_id.clone().unwrap();
    job.selected_patch = registry.lookup(&id, "cc").cloned();
    assert!(job.selected_patch.is_some());

    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(42);
    let outcome = executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap();

    let out_dir = fixture.config.output_dir.join("GPFC_RMCE01");
    assert_eq!(outcome, BuildOutcome::Completed(out_dir.clone()));
    assert!(out_dir.join("title.tmd").exists());

    // All ten stages were announced, in order.
    drop(tx);
    let mut stages = Vec::new();
    while let Ok(update) = rx.try_recv() {
        if let BuildProgress::StageStarted { stage } = update {
            stages.push(stage);
        }
    }
    assert_eq!(stages, BuildStage::ALL.to_vec());
}

#[tokio::test]
async fn base_cache_survives_and_skips_refetch() {
    let fixture = fixture("");
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(1);

    executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap();

    // Swap the downloader for one that fails: the cached base files
    // must make the second run succeed without fetching.
    write_script(&fixture.config.tool_repo, "jnusfetch", "exit 1");
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let second = executor
        .run(&job, &base_title(), &mut minter, &tx2, &CancelToken::new())
        .await
        .unwrap();
    assert!(matches!(second, BuildOutcome::Completed(_)));

    // And the run says so.
    drop(tx2);
    let mut noted = false;
    while let Ok(update) = rx2.try_recv() {
        if let BuildProgress::Note { message } = update {
            noted |= message.contains("already cached");
        }
    }
    assert!(noted);
}

#[tokio::test]
async fn artwork_textures_are_staged_from_the_cache() {
    let mut fixture = fixture("");
    fixture.config.keep_workspace = true;
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(5);

    executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap();

    let meta = executor.workspace().assembly().join("meta");
    for name in [ICON_FILE, TV_FILE, DRC_FILE] {
        let staged = meta.join(name);
        assert!(staged.exists(), "{name} not staged");
        let cached = fixture.derived.join(name);
        assert_eq!(
            std::fs::read(&staged).unwrap(),
            std::fs::read(&cached).unwrap(),
            "{name} differs from the cached texture"
        );
    }
}

#[tokio::test]
async fn missing_cached_texture_fails_the_artwork_stage() {
    let fixture = fixture("");
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    if let Some(artwork) = &job.artwork {
        std::fs::remove_file(&artwork.icon).unwrap();
    }

    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(6);

    let err = executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap_err();
    match err {
        BuildError::MissingArtifact(what) => assert!(what.contains(ICON_FILE)),
        other => panic!("expected missing artifact, got {other:?}"),
    }
}

#[tokio::test]
async fn trim_failure_falls_back_to_the_whole_disc() {
    let fixture = fixture("");
    // The data partition refuses to extract alone; whole-disc and the
    // signing-record pass (which adds --files) still work.
    write_script(
        &fixture.config.tool_repo,
        "wit",
        r#"cmd=$1
dest=""
files=0
psel=""
prev=""
for a in "$@"; do
  case "$prev" in --dest|--DEST) dest=$a;; --psel) psel=$a;; esac
  [ "$a" = "--files" ] && files=1
  prev=$a
done
if [ "$cmd" = "extract" ]; then
  if [ "$psel" = "data" ] && [ $files -eq 0 ]; then echo "no data partition" >&2; exit 1; fi
  mkdir -p "$dest/sys"
  : > "$dest/sys/main.dol"
  if [ $files -eq 1 ]; then : > "$dest/tmd.bin"; : > "$dest/ticket.bin"; fi
else
  : > "$dest"
fi"#,
    );

    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(7);

    let outcome = executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap();
    assert!(matches!(outcome, BuildOutcome::Completed(_)));

    drop(tx);
    let mut noted = false;
    while let Ok(update) = rx.try_recv() {
        if let BuildProgress::Note { message } = update {
            noted |= message.contains("whole disc");
        }
    }
    assert!(noted);
}

#[tokio::test]
async fn cancellation_during_encoding_stops_before_packaging() {
    let fixture = fixture("sleep 1");
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();

    // Cancel as soon as the encoding stage begins; the stage still
    // finishes, but packaging never starts.
    let watcher_cancel = cancel.clone();
    let watcher = tokio::spawn(async move {
        let mut saw_packaging = false;
        while let Some(update) = rx.recv().await {
            match update {
                BuildProgress::StageStarted {
                    stage: BuildStage::ContentEncoding,
                } => watcher_cancel.cancel(),
                BuildProgress::StageStarted {
                    stage: BuildStage::Packaging,
                } => saw_packaging = true,
                _ => {}
            }
        }
        saw_packaging
    });

    let mut minter = IdMinter::with_seed(2);
    let outcome = executor
        .run(&job, &base_title(), &mut minter, &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(outcome, BuildOutcome::Cancelled);
    assert!(!watcher.await.unwrap());
    assert!(
        !fixture
            .config
            .output_dir
            .join("GP_RMCE01")
            .join("title.tmd")
            .exists()
    );
}

#[tokio::test]
async fn batch_runs_jobs_serially_with_weighted_progress() {
    use vc_forge_build::{BatchEvent, BatchScheduler};

    let fixture = fixture("");
    let second_iso = fixture.iso.with_file_name("second.iso");
    sample_iso(&second_iso, "SB4E01", "SUPER MARIO GALAXY 2");

    let first = job_for(&fixture, ControllerProfile::GamepadCc);
    let mut second = job_for(&fixture, ControllerProfile::NoGamepad);
    second.source_path = second_iso;
    second.content_id = Some("SB4E01".parse::<ContentId>().unwrap());
    second.display_title = Some("Super Mario Galaxy 2".to_string());

    let mut scheduler = BatchScheduler::new(vec![first, second]);
    assert_eq!(scheduler.detect_conflicts(), 0);

    let executor = PipelineExecutor::new(fixture.config.clone());
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(9);
    let summary = scheduler.run(&executor, &mut minter, &events_tx).await;

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);
    assert!(
        fixture
            .config
            .output_dir
            .join("GP_RMCE01/title.tmd")
            .exists()
    );
    assert!(
        fixture
            .config
            .output_dir
            .join("NOGP_SB4E01/title.tmd")
            .exists()
    );

    drop(events_tx);
    let mut last_percent = 0.0;
    let mut done = None;
    while let Ok(event) = events_rx.try_recv() {
        match event {
            BatchEvent::Progress { percent } => {
                assert!(percent >= last_percent, "{percent} < {last_percent}");
                assert!(percent <= 100.0);
                last_percent = percent;
            }
            BatchEvent::Done {
                completed,
                failed,
                skipped,
                cancelled,
            } => done = Some((completed, failed, skipped, cancelled)),
            _ => {}
        }
    }
    assert_eq!(done, Some((2, 0, 0, false)));
    assert_eq!(last_percent, 100.0);
}

#[tokio::test]
async fn missing_common_key_blocks_the_run() {
    let mut fixture = fixture("");
    fixture.config.common_key = None;
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(3);

    let err = executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingKey));
}

#[tokio::test]
async fn tool_failure_surfaces_its_stderr() {
    let fixture = fixture("");
    write_script(
        &fixture.config.tool_repo,
        "nuspacker",
        "echo 'bad NUS content' >&2; exit 3",
    );
    let job = job_for(&fixture, ControllerProfile::GamepadCc);
    let executor = PipelineExecutor::new(fixture.config.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut minter = IdMinter::with_seed(4);

    let err = executor
        .run(&job, &base_title(), &mut minter, &tx, &CancelToken::new())
        .await
        .unwrap_err();
    match err {
        BuildError::Tool { tool, message } => {
            assert_eq!(tool, "nuspacker");
            assert!(message.contains("bad NUS content"));
        }
        other => panic!("expected tool error, got {other:?}"),
    }
}
