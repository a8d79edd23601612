//! Segment recording
//!
//! One recorder per session, one open segment file per recorder.

pub mod segment;
pub mod state;

pub use segment::SegmentRecorder;
pub use state::{RecorderHandle, RecorderState, SegmentDescriptor};
