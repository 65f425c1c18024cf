use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Route prefix every object URL starts with.
pub const PREVIEW_ROUTE_PREFIX: &str = "/previews/";

#[derive(Debug, Clone)]
pub struct PreviewBlob {
    pub data: Bytes,
    pub mime: String,
}

/// Object-URL table. A URL stays resolvable until it is revoked.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    blobs: Arc<RwLock<HashMap<Uuid, PreviewBlob>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data` and returns a URL that serves it.
    pub fn create_object_url(&self, data: Bytes, mime: &str) -> String {
        let token = Uuid::new_v4();
        self.blobs.write().insert(
            token,
            PreviewBlob {
                data,
                mime: mime.to_string(),
            },
        );
        debug!("Created object URL {token} ({mime})");
        format!("{PREVIEW_ROUTE_PREFIX}{token}")
    }

    /// Releases a URL. Returns false if it was unknown or already revoked.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        let Some(token) = parse_url(url) else {
            return false;
        };
        let removed = self.blobs.write().remove(&token).is_some();
        if removed {
            debug!("Revoked object URL {token}");
        }
        removed
    }

    pub fn resolve(&self, token: &Uuid) -> Option<PreviewBlob> {
        self.blobs.read().get(token).cloned()
    }

    /// Number of live URLs.
    pub fn live_count(&self) -> usize {
        self.blobs.read().len()
    }
}

#[cfg(test)]
impl PreviewRegistry {
    pub fn resolve_url(&self, url: &str) -> Option<PreviewBlob> {
        parse_url(url).and_then(|t| self.resolve(&t))
    }

    pub fn contains(&self, url: &str) -> bool {
        parse_url(url).is_some_and(|t| self.blobs.read().contains_key(&t))
    }
}

fn parse_url(url: &str) -> Option<Uuid> {
    url.strip_prefix(PREVIEW_ROUTE_PREFIX)
        .and_then(|t| Uuid::parse_str(t).ok())
}
