use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use super::card::CardSnapshot;
use super::detail::DetailSnapshot;
use super::{ResumeCardView, ResumeDetailView};

pub enum MountedView {
    Detail(ResumeDetailView),
    Card(ResumeCardView),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewSnapshot {
    Detail(DetailSnapshot),
    Card(CardSnapshot),
}

impl MountedView {
    pub fn snapshot(&self) -> ViewSnapshot {
        match self {
            MountedView::Detail(view) => ViewSnapshot::Detail(view.snapshot()),
            MountedView::Card(view) => ViewSnapshot::Card(view.snapshot()),
        }
    }
}

/// Shared slot for one mounted view. `None` once the view is unmounted.
pub type ViewEntry = Arc<AsyncMutex<Option<MountedView>>>;

/// Views the client currently has mounted, keyed by view id.
///
/// A refresh holds the entry's lock for its whole update; unmount removes the
/// entry, waits for that lock and drops the view, which unmounts its preview
/// slots.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    views: Arc<Mutex<HashMap<Uuid, ViewEntry>>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, view: MountedView) -> Uuid {
        let view_id = Uuid::new_v4();
        self.views
            .lock()
            .insert(view_id, Arc::new(AsyncMutex::new(Some(view))));
        view_id
    }

    pub fn get(&self, view_id: &Uuid) -> Option<ViewEntry> {
        self.views.lock().get(view_id).cloned()
    }

    /// Removes the view and tears it down once any in-progress refresh ends.
    pub async fn unmount(&self, view_id: &Uuid) -> bool {
        let entry = self.views.lock().remove(view_id);
        let Some(entry) = entry else {
            return false;
        };
        let view = entry.lock().await.take();
        view.is_some()
    }

    pub fn mounted_count(&self) -> usize {
        self.views.lock().len()
    }
}
