// Profesoria library entry
// Course generation, grading, library persistence and classroom export;
// the `profesoria` binary is a thin CLI over these modules.

pub mod classroom_export;
pub mod config;
pub mod course;
pub mod course_generation;
pub mod error_recovery;
pub mod gemini_adapter;
pub mod json_recovery;
pub mod json_validator;
pub mod library;
pub mod models;
pub mod submission_grading;
pub mod utils;

pub use models::{AppError, AppErrorType};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber; `RUST_LOG` overrides the `info` default.
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
