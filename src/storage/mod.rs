//! Session persistence
//!
//! The coordinator records sessions through the [`SessionStore`] trait; two
//! stores ship with the crate: in-memory and one-JSON-file-per-session.

pub mod json_store;
pub mod schema;
pub mod store;

pub use json_store::JsonSessionStore;
pub use schema::{FinalInfo, HistoryEntry, PoseRecord, SessionDocument, SessionStats};
pub use store::{InMemorySessionStore, SessionStore};
