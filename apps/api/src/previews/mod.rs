//! Displayable URLs for in-memory blobs and the per-view slots that own them.
//!
//! `registry` is the object-URL table (create / serve / revoke). `slot` is the
//! lifecycle manager views use so every URL they create is released exactly once.

pub mod handlers;
pub mod registry;
pub mod slot;

pub use registry::PreviewRegistry;
pub use slot::{PreviewCell, PreviewSlot};
