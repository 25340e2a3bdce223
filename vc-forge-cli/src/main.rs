//! vc-forge CLI
//!
//! Command-line interface for building Wii U virtual-console packages
//! from Wii disc images.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vc_forge_core::ControllerProfile;

mod commands;
mod paths;

#[derive(Parser)]
#[command(name = "vc-forge")]
#[command(about = "Build Wii U virtual-console packages from Wii disc images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Common arguments for commands that run builds.
#[derive(Args, Clone)]
struct BuildArgs {
    /// Controller profile (no-gamepad, gamepad, gamepad-lr, force-cc,
    /// wiimote, horizontal-wiimote, passthrough)
    #[arg(short, long, default_value = "gamepad")]
    profile: ControllerProfile,

    /// Output directory (defaults to the configured one)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding the tool binaries
    #[arg(long)]
    tools: Option<PathBuf>,

    /// Directory of .gct patch files
    #[arg(long)]
    patches: Option<PathBuf>,

    /// Extract the whole disc instead of just the data partition
    #[arg(long)]
    no_trim: bool,

    /// Keep the build workspace after the run, for debugging
    #[arg(long)]
    keep_workspace: bool,

    /// Generate placeholder artwork when none can be found
    #[arg(long)]
    placeholders: bool,

    /// Local directory of cover images checked before the network
    #[arg(long)]
    art_repo: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a package from one source image
    Build {
        /// Source disc image (ISO, WBFS, or NASOS)
        source: PathBuf,

        /// Menu title override
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build packages for every image in a directory
    Batch {
        /// Directory of source images
        dir: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Probe a source image and show what the store knows about it
    Resolve {
        /// Source disc image
        source: PathBuf,
    },

    /// Search stored compatibility records by title
    Search {
        /// Title substring, case-insensitive
        query: String,
    },

    /// Import a compatibility CSV into the store
    Import {
        /// CSV file with Title,Region,Host_Game,... columns
        csv: PathBuf,
    },

    /// Manage the common key and per-base title keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Manage the artwork cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Adjust persistent settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// Set the platform common key
    SetCommon { key: String },

    /// Set the title key for a base content code (e.g. VAKE01)
    SetTitle { base_code: String, key: String },

    /// Store a default key against a full base content name
    SetBase { base_content: String, key: String },

    /// Show the settings file contents
    Show,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the default output directory
    SetOutput { dir: PathBuf },

    /// Override the donor Wii U title id for a base content code
    SetBaseId { base_code: String, title_id: String },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Download artwork for content ids ahead of a batch run
    Prefetch {
        /// Content ids (e.g. RMCE01,SB4P01)
        #[arg(value_delimiter = ',')]
        ids: Vec<String>,

        /// Generate placeholders for ids with no artwork anywhere
        #[arg(long)]
        placeholders: bool,
    },

    /// Show cached artwork counts
    Stats,

    /// Remove all cached artwork
    Clear,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let exit = match cli.command {
        Commands::Build {
            source,
            title,
            build,
        } => commands::build::run_build(source, title, build).await,
        Commands::Batch { dir, build } => commands::build::run_batch(dir, build).await,
        Commands::Resolve { source } => commands::resolve::run_resolve(&source),
        Commands::Search { query } => commands::resolve::run_search(&query),
        Commands::Import { csv } => commands::import::run_import(&csv),
        Commands::Keys { action } => match action {
            KeysAction::SetCommon { key } => commands::keys::run_set_common(&key),
            KeysAction::SetTitle { base_code, key } => {
                commands::keys::run_set_title(&base_code, &key)
            }
            KeysAction::SetBase { base_content, key } => {
                commands::keys::run_set_base(&base_content, &key)
            }
            KeysAction::Show => commands::keys::run_show(),
        },
        Commands::Cache { action } => match action {
            CacheAction::Prefetch { ids, placeholders } => {
                commands::cache::run_prefetch(ids, placeholders).await
            }
            CacheAction::Stats => commands::cache::run_stats(),
            CacheAction::Clear => commands::cache::run_clear(),
        },
        Commands::Config { action } => match action {
            ConfigAction::SetOutput { dir } => commands::config::run_set_output(&dir),
            ConfigAction::SetBaseId {
                base_code,
                title_id,
            } => commands::config::run_set_base_id(&base_code, &title_id),
        },
    };
    std::process::exit(exit);
}
