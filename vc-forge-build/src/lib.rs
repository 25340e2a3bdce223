//! The injection pipeline and batch scheduler.
//!
//! A [`PipelineExecutor`] turns one source disc image into an
//! installable package through ten ordered stages; a [`BatchScheduler`]
//! prepares many jobs concurrently and then runs them through the
//! executor one at a time over the shared workspace.

pub mod basefiles;
pub mod batch;
pub mod cancel;
pub mod error;
pub mod job;
pub mod meta;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod settings;
pub mod tools;
pub mod workspace;

pub use batch::{BatchScheduler, BatchSummary};
pub use cancel::CancelToken;
pub use error::{BuildError, BuildOutcome};
pub use job::{BuildJob, JobStatus};
pub use pipeline::{BuildConfig, PipelineExecutor};
pub use progress::{BatchEvent, BuildProgress, BuildStage};
pub use tools::ToolKit;
