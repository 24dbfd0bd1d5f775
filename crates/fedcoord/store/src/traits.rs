use crate::StoreResult;
use async_trait::async_trait;
use fedcoord_types::ContentDigest;

/// Contract of a single content-addressed backend.
///
/// `put` must be idempotent: re-putting identical bytes yields the identical
/// digest and does not duplicate storage. Digests are derived from content
/// alone, never from the backend that stored it.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist bytes and return their content digest.
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentDigest>;

    /// Fetch bytes by digest.
    async fn get(&self, digest: &ContentDigest) -> StoreResult<Vec<u8>>;

    /// Retention hint: keep this digest's content around.
    async fn pin(&self, digest: &ContentDigest) -> StoreResult<()>;

    /// Cheap reachability probe.
    async fn health(&self) -> bool;
}
