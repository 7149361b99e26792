use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::error::ProcessError;

/// Registry of blob URLs handed to the renderer.
///
/// Clones share the same table. URLs are only minted through
/// [`Self::create`], which returns an [`ObjectUrl`] guard that revokes the
/// entry when dropped.
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    urls: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl std::fmt::Debug for ObjectUrlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectUrlRegistry({} live)", self.live_count())
    }
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, blob: Bytes) -> ObjectUrl {
        let url = format!("blob:builder/{}", Uuid::new_v4());
        if let Ok(mut map) = self.urls.lock() {
            map.insert(url.clone(), blob);
        }
        debug!(%url, "object url created");
        ObjectUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.urls.lock().ok().and_then(|map| map.get(url).cloned())
    }

    /// Number of URLs created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.urls.lock().map(|map| map.len()).unwrap_or(0)
    }

    fn revoke(&self, url: &str) {
        if let Ok(mut map) = self.urls.lock() {
            map.remove(url);
        }
    }
}

/// RAII guard for one registered blob URL.
///
/// Hold it for as long as the renderer may read the URL; dropping it revokes
/// the URL on every exit path, including `?` returns.
pub struct ObjectUrl {
    url: String,
    registry: ObjectUrlRegistry,
}

impl std::fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The blob behind this URL.
    pub fn resolve(&self) -> Result<Bytes, ProcessError> {
        self.registry
            .resolve(&self.url)
            .ok_or_else(|| ProcessError::ObjectUrl(self.url.clone()))
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
        debug!(url = %self.url, "object url revoked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_revokes_on_drop() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Bytes::from_static(b"glb"));
        let key = url.as_str().to_owned();

        assert_eq!(registry.live_count(), 1);
        assert_eq!(url.resolve().unwrap(), Bytes::from_static(b"glb"));

        drop(url);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&key).is_none());
    }

    #[test]
    fn urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(Bytes::new());
        let b = registry.create(Bytes::new());
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(registry.live_count(), 2);
    }
}
