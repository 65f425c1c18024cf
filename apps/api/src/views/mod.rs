//! View models for the resume list card and the resume detail page.
//!
//! A view is mounted by the client, owns preview slots for the blobs it shows,
//! and releases every URL it created when the client unmounts it.

use std::sync::Arc;

use crate::previews::PreviewRegistry;
use crate::storage::{BlobStore, KvStore};

pub mod card;
pub mod detail;
pub mod handlers;
pub mod registry;

pub use card::ResumeCardView;
pub use detail::ResumeDetailView;
pub use registry::{MountedView, ViewRegistry};

/// Collaborators every view needs.
#[derive(Clone)]
pub struct ViewContext {
    pub blobs: Arc<dyn BlobStore>,
    pub kv: Arc<dyn KvStore>,
    pub previews: PreviewRegistry,
}
