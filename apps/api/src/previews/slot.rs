//! Preview slot: fetches one blob for a view and owns the URL created for it.
//!
//! Rules:
//! - a URL is created only after the blob has been read;
//! - the previous URL is revoked exactly once when the source changes, when a
//!   newer load supersedes an in-flight one, or when the slot is torn down;
//! - a load that resolves after teardown or after being superseded writes
//!   nothing and creates nothing. In-flight reads are not aborted.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::PreviewRegistry;
use crate::storage::BlobStore;

/// Receives state updates for the view that owns a slot.
pub trait PreviewSink: Send + Sync + 'static {
    fn on_loaded(&self, url: &str);
    fn on_failed(&self, reason: &str);
    /// The published URL was released because the source changed.
    fn on_cleared(&self) {}
}

/// View-local preview state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviewState {
    pub url: Option<String>,
    pub error: Option<String>,
}

/// Shared cell a view reads its preview state from.
#[derive(Clone, Default)]
pub struct PreviewCell(Arc<Mutex<PreviewState>>);

impl PreviewCell {
    pub fn snapshot(&self) -> PreviewState {
        self.0.lock().clone()
    }
}

impl PreviewSink for PreviewCell {
    fn on_loaded(&self, url: &str) {
        let mut state = self.0.lock();
        state.url = Some(url.to_string());
        state.error = None;
    }

    fn on_failed(&self, reason: &str) {
        let mut state = self.0.lock();
        state.url = None;
        state.error = Some(reason.to_string());
    }

    fn on_cleared(&self) {
        *self.0.lock() = PreviewState::default();
    }
}

#[derive(Default)]
struct SlotInner {
    mounted: bool,
    generation: u64,
    current_url: Option<String>,
}

pub struct PreviewSlot {
    blobs: Arc<dyn BlobStore>,
    previews: PreviewRegistry,
    mime: &'static str,
    sink: Arc<dyn PreviewSink>,
    source: Option<String>,
    inner: Arc<Mutex<SlotInner>>,
    in_flight: Option<JoinHandle<()>>,
}

impl PreviewSlot {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        previews: PreviewRegistry,
        mime: &'static str,
        sink: Arc<dyn PreviewSink>,
    ) -> Self {
        Self {
            blobs,
            previews,
            mime,
            sink,
            source: None,
            inner: Arc::new(Mutex::new(SlotInner {
                mounted: true,
                ..SlotInner::default()
            })),
            in_flight: None,
        }
    }

    #[cfg(test)]
    pub fn current_url(&self) -> Option<String> {
        self.inner.lock().current_url.clone()
    }

    /// Points the slot at `path` and starts loading it. Same path is a no-op.
    pub fn set_source(&mut self, path: &str) {
        if self.source.as_deref() == Some(path) {
            return;
        }

        let generation = {
            let mut inner = self.inner.lock();
            if !inner.mounted {
                return;
            }
            inner.generation += 1;
            if let Some(url) = inner.current_url.take() {
                self.previews.revoke_object_url(&url);
                self.sink.on_cleared();
            }
            inner.generation
        };
        self.source = Some(path.to_string());

        // A superseded task keeps running; its generation check discards the result.
        self.in_flight = Some(tokio::spawn(load(
            self.blobs.clone(),
            self.previews.clone(),
            self.mime,
            self.sink.clone(),
            self.inner.clone(),
            path.to_string(),
            generation,
        )));
    }

    /// Forgets the source and releases its URL. The slot stays mounted and
    /// any load still in flight is discarded.
    pub fn clear(&mut self) {
        {
            let mut inner = self.inner.lock();
            if !inner.mounted {
                return;
            }
            inner.generation += 1;
            if let Some(url) = inner.current_url.take() {
                self.previews.revoke_object_url(&url);
            }
        }
        self.source = None;
        self.in_flight = None;
        self.sink.on_cleared();
    }

    /// Waits for the latest load to finish.
    pub async fn settled(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                error!("Preview load task failed: {e}");
            }
        }
    }

    /// Tears the slot down: no further state writes, current URL revoked.
    pub fn unmount(&mut self) {
        let mut inner = self.inner.lock();
        if !inner.mounted {
            return;
        }
        inner.mounted = false;
        inner.generation += 1;
        if let Some(url) = inner.current_url.take() {
            self.previews.revoke_object_url(&url);
        }
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn load(
    blobs: Arc<dyn BlobStore>,
    previews: PreviewRegistry,
    mime: &'static str,
    sink: Arc<dyn PreviewSink>,
    inner: Arc<Mutex<SlotInner>>,
    path: String,
    generation: u64,
) {
    let result = blobs.read(&path).await;

    let mut guard = inner.lock();
    if !guard.mounted || guard.generation != generation {
        debug!("Discarding stale preview load for {path}");
        return;
    }

    match result {
        Ok(Some(data)) => {
            let url = previews.create_object_url(data, mime);
            guard.current_url = Some(url.clone());
            sink.on_loaded(&url);
        }
        Ok(None) => {
            warn!("Failed to read blob at path: {path}");
            sink.on_failed("Preview unavailable");
        }
        Err(e) => {
            error!("Error loading blob {path}: {e}");
            sink.on_failed("Preview unavailable");
        }
    }
}
