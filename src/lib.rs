//! Pose Coach - real-time pose scoring with annotated session recording.
//!
//! Scores body-keypoint frames against a table of pose rules, records a video
//! segment per practised pose from the session camera and assembles the
//! segments into one annotated session video.

pub mod capture;
pub mod config;
pub mod export;
pub mod feedback;
pub mod pose;
pub mod recorder;
pub mod session;
pub mod speech;
pub mod storage;
pub mod utils;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CoachConfig;
pub use pose::{ClassificationResult, Keypoint, PoseEngine};
pub use session::{CoordinatorSettings, SessionCoordinator};
pub use utils::error::{CoachError, CoachResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default `EnvFilter` directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "pose_coach=debug";

/// Initialize tracing/logging. `RUST_LOG` wins over `default_filter`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if result.is_ok() {
        tracing::debug!("Pose Coach v{} logging initialized", env!("CARGO_PKG_VERSION"));
    }
}
