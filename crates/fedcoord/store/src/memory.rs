//! In-memory reference backend for the content-store contract.
//!
//! Deterministic and test-friendly, with an availability toggle so failover
//! paths can be exercised without a real backend going down.

use crate::traits::ContentStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use fedcoord_types::ContentDigest;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-memory content-addressed backend.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentDigest, Vec<u8>>>,
    pinned: RwLock<HashSet<ContentDigest>>,
    unavailable: AtomicBool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend dropping off the network.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn is_pinned(&self, digest: &ContentDigest) -> bool {
        self.pinned
            .read()
            .map(|pinned| pinned.contains(digest))
            .unwrap_or(false)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentDigest> {
        self.check_available()?;

        let digest = ContentDigest::from_bytes(bytes);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| StoreError::Unavailable("blob lock poisoned".to_string()))?;
        // Idempotent: identical bytes land on the same key.
        blobs.entry(digest.clone()).or_insert_with(|| bytes.to_vec());
        Ok(digest)
    }

    async fn get(&self, digest: &ContentDigest) -> StoreResult<Vec<u8>> {
        self.check_available()?;

        let blobs = self
            .blobs
            .read()
            .map_err(|_| StoreError::Unavailable("blob lock poisoned".to_string()))?;
        blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(digest.clone()))
    }

    async fn pin(&self, digest: &ContentDigest) -> StoreResult<()> {
        self.check_available()?;

        let blobs = self
            .blobs
            .read()
            .map_err(|_| StoreError::Unavailable("blob lock poisoned".to_string()))?;
        if !blobs.contains_key(digest) {
            return Err(StoreError::NotFound(digest.clone()));
        }
        drop(blobs);

        let mut pinned = self
            .pinned
            .write()
            .map_err(|_| StoreError::Unavailable("pin lock poisoned".to_string()))?;
        pinned.insert(digest.clone());
        Ok(())
    }

    async fn health(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}
