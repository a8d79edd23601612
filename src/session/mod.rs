//! Practice sessions
//!
//! A session owns one camera, records per-pose segments while the caller
//! streams keypoint frames, and is assembled into a single video at the end.

pub mod coordinator;
pub mod registry;
pub mod state;

pub use coordinator::{CoordinatorSettings, SessionCoordinator};
pub use registry::{SessionRegistry, SharedSession};
pub use state::{SessionIdGenerator, SessionSnapshot, SessionState};
