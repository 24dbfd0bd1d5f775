//! Designated-backend routing with ordered failover.
//!
//! Each hospital uploads to its own backend; when that backend is
//! unreachable the call falls back to any reachable one. Digests are
//! content-derived, so a fallback upload stays verifiable everywhere.

use crate::traits::ContentStore;
use crate::{StoreError, StoreResult};
use fedcoord_types::{AccountId, ContentDigest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One independently-addressed backend.
#[derive(Clone)]
pub struct StoreBackend {
    pub endpoint: String,
    pub store: Arc<dyn ContentStore>,
}

/// Routes store calls across a fleet of backends with a per-call deadline.
pub struct StoreRouter {
    backends: Vec<StoreBackend>,
    assignments: HashMap<AccountId, String>,
    call_timeout: Duration,
}

impl StoreRouter {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            backends: Vec::new(),
            assignments: HashMap::new(),
            call_timeout,
        }
    }

    pub fn with_backend(mut self, endpoint: impl Into<String>, store: Arc<dyn ContentStore>) -> Self {
        self.backends.push(StoreBackend {
            endpoint: endpoint.into(),
            store,
        });
        self
    }

    /// Designate a hospital's own backend by endpoint name.
    pub fn assign(mut self, hospital: AccountId, endpoint: impl Into<String>) -> Self {
        self.assignments.insert(hospital, endpoint.into());
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Backends that currently answer a health probe, in configured order.
    pub async fn available_backends(&self) -> Vec<String> {
        let mut available = Vec::new();
        for backend in &self.backends {
            let healthy = tokio::time::timeout(self.call_timeout, backend.store.health())
                .await
                .unwrap_or(false);
            if healthy {
                available.push(backend.endpoint.clone());
            }
        }
        available
    }

    /// Upload via the hospital's designated backend, falling back to any
    /// other reachable backend. The digest is backend-independent either way.
    pub async fn put_for(&self, hospital: &AccountId, bytes: &[u8]) -> StoreResult<ContentDigest> {
        let designated = self.assignments.get(hospital);
        let mut last_err = StoreError::Unavailable("no backends configured".to_string());

        for backend in self.candidates(designated) {
            match self.timed(backend.store.put(bytes)).await {
                Ok(digest) => {
                    if designated.is_some_and(|endpoint| endpoint != &backend.endpoint) {
                        warn!(
                            hospital = %hospital,
                            backend = %backend.endpoint,
                            "designated backend unreachable, fell back"
                        );
                    }
                    return Ok(digest);
                }
                Err(err) => {
                    debug!(backend = %backend.endpoint, error = %err, "put failed");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    /// Upload without a designated backend (admin/global artifacts).
    pub async fn put(&self, bytes: &[u8]) -> StoreResult<ContentDigest> {
        let mut last_err = StoreError::Unavailable("no backends configured".to_string());
        for backend in &self.backends {
            match self.timed(backend.store.put(bytes)).await {
                Ok(digest) => return Ok(digest),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    /// Fetch by digest from whichever backend holds the content. `NotFound`
    /// only when at least one backend answered and none had it.
    pub async fn get(&self, digest: &ContentDigest) -> StoreResult<Vec<u8>> {
        let mut any_reachable = false;
        let mut last_err = StoreError::Unavailable("no backends configured".to_string());

        for backend in &self.backends {
            match self.timed(backend.store.get(digest)).await {
                Ok(bytes) => return Ok(bytes),
                Err(StoreError::NotFound(_)) => {
                    any_reachable = true;
                }
                Err(err) => last_err = err,
            }
        }

        if any_reachable {
            Err(StoreError::NotFound(digest.clone()))
        } else {
            Err(last_err)
        }
    }

    /// Pin on every backend that holds the content; succeeds if any did.
    pub async fn pin(&self, digest: &ContentDigest) -> StoreResult<()> {
        let mut pinned_somewhere = false;
        let mut last_err = StoreError::Unavailable("no backends configured".to_string());

        for backend in &self.backends {
            match self.timed(backend.store.pin(digest)).await {
                Ok(()) => pinned_somewhere = true,
                Err(err) => last_err = err,
            }
        }

        if pinned_somewhere {
            Ok(())
        } else {
            Err(last_err)
        }
    }

    fn candidates<'a>(
        &'a self,
        designated: Option<&'a String>,
    ) -> impl Iterator<Item = &'a StoreBackend> {
        let preferred = designated.and_then(|endpoint| {
            self.backends
                .iter()
                .find(|backend| &backend.endpoint == endpoint)
        });
        let rest = self.backends.iter().filter(move |backend| {
            designated.map_or(true, |endpoint| &backend.endpoint != endpoint)
        });
        preferred.into_iter().chain(rest)
    }

    async fn timed<T>(
        &self,
        call: impl std::future::Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.call_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryContentStore;

    fn hospital(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn router_with(backends: Vec<(&str, Arc<InMemoryContentStore>)>) -> StoreRouter {
        let mut router = StoreRouter::new(Duration::from_millis(250));
        for (endpoint, store) in backends {
            router = router.with_backend(endpoint, store as Arc<dyn ContentStore>);
        }
        router
    }

    #[tokio::test]
    async fn put_lands_on_designated_backend() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let node2 = Arc::new(InMemoryContentStore::new());
        let router = router_with(vec![("node1", node1.clone()), ("node2", node2.clone())])
            .assign(hospital("h1"), "node1");

        router.put_for(&hospital("h1"), b"weights").await.unwrap();

        assert_eq!(node1.blob_count(), 1);
        assert_eq!(node2.blob_count(), 0);
    }

    #[tokio::test]
    async fn put_falls_back_when_designated_backend_is_down() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let node2 = Arc::new(InMemoryContentStore::new());
        node1.set_available(false);

        let router = router_with(vec![("node1", node1.clone()), ("node2", node2.clone())])
            .assign(hospital("h1"), "node1");

        let digest = router.put_for(&hospital("h1"), b"weights").await.unwrap();

        assert_eq!(node1.blob_count(), 0);
        assert_eq!(node2.blob_count(), 1);
        // The fallback digest is the one any backend would have produced.
        assert_eq!(digest, ContentDigest::from_bytes(b"weights"));
    }

    #[tokio::test]
    async fn all_backends_down_is_unavailable() {
        let node1 = Arc::new(InMemoryContentStore::new());
        node1.set_available(false);
        let router =
            router_with(vec![("node1", node1)]).assign(hospital("h1"), "node1");

        assert!(matches!(
            router.put_for(&hospital("h1"), b"weights").await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn get_searches_across_backends() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let node2 = Arc::new(InMemoryContentStore::new());
        let digest = node2.put(b"weights").await.unwrap();

        let router = router_with(vec![("node1", node1), ("node2", node2)]);

        assert_eq!(router.get(&digest).await.unwrap(), b"weights");
    }

    #[tokio::test]
    async fn get_reports_not_found_only_when_a_backend_answered() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let router = router_with(vec![("node1", node1.clone())]);
        let digest = ContentDigest::from_bytes(b"missing");

        assert!(matches!(
            router.get(&digest).await.unwrap_err(),
            StoreError::NotFound(_)
        ));

        node1.set_available(false);
        assert!(matches!(
            router.get(&digest).await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn health_sweep_lists_reachable_backends() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let node2 = Arc::new(InMemoryContentStore::new());
        node1.set_available(false);

        let router = router_with(vec![("node1", node1), ("node2", node2)]);

        assert_eq!(router.available_backends().await, vec!["node2"]);
    }

    #[tokio::test]
    async fn pin_succeeds_on_any_holder() {
        let node1 = Arc::new(InMemoryContentStore::new());
        let node2 = Arc::new(InMemoryContentStore::new());
        let digest = node2.put(b"weights").await.unwrap();

        let router = router_with(vec![("node1", node1), ("node2", node2.clone())]);

        router.pin(&digest).await.unwrap();
        assert!(node2.is_pinned(&digest));
    }
}
