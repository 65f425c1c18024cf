use std::sync::Arc;

use crate::analysis::feedback::FeedbackProvider;
use crate::analysis::jobs::UploadJobs;
use crate::analysis::upload_flow::UploadFlow;
use crate::config::Config;
use crate::previews::PreviewRegistry;
use crate::render::PageRasterizer;
use crate::storage::{BlobStore, KvStore};
use crate::views::{ViewContext, ViewRegistry};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub blobs: Arc<dyn BlobStore>,
    pub kv: Arc<dyn KvStore>,
    /// AI inference. Default: Claude over the extracted resume text.
    pub feedback: Arc<dyn FeedbackProvider>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    /// Object URLs served under `/previews/`.
    pub previews: PreviewRegistry,
    pub uploads: UploadJobs,
    pub views: ViewRegistry,
    pub config: Config,
}

impl AppState {
    pub fn upload_flow(&self) -> UploadFlow {
        UploadFlow {
            blobs: self.blobs.clone(),
            kv: self.kv.clone(),
            feedback: self.feedback.clone(),
            rasterizer: self.rasterizer.clone(),
            previews: self.previews.clone(),
            render_scale: self.config.render_scale,
        }
    }

    pub fn view_context(&self) -> ViewContext {
        ViewContext {
            blobs: self.blobs.clone(),
            kv: self.kv.clone(),
            previews: self.previews.clone(),
        }
    }
}
