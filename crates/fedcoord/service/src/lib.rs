//! Fedcoord Service - The federated round workflow in one facade
//!
//! Composes the content-store router and the round tracker into the flows
//! the participants actually run: upload a local update and submit its
//! reference, close a round, publish the aggregated model. The ordering is
//! always upload-then-submit, so a failed or cancelled upload never leaves
//! a ledger entry pointing at absent content.

#![deny(unsafe_code)]

use fedcoord_coordinator::{ClosedRound, CoordinationError, RoundTracker, TxRecord};
use fedcoord_store::{StoreError, StoreRouter};
use fedcoord_types::{
    AccountId, ContentDigest, GlobalArtifact, HospitalContribution, Submission,
    SubmissionReceipt, TxId,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by the workflow facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The federation workflow service.
pub struct FederationService {
    store: StoreRouter,
    tracker: Arc<RoundTracker>,
}

impl FederationService {
    pub fn new(tracker: Arc<RoundTracker>, store: StoreRouter) -> Self {
        Self { store, tracker }
    }

    pub fn tracker(&self) -> &Arc<RoundTracker> {
        &self.tracker
    }

    pub fn store(&self) -> &StoreRouter {
        &self.store
    }

    // ── Participant workflow ────────────────────────────────────────

    /// Upload a local model update via the hospital's designated backend
    /// (falling back if it is down) and pin the result.
    pub async fn upload_update(
        &self,
        hospital: &AccountId,
        bytes: &[u8],
    ) -> Result<ContentDigest, ServiceError> {
        let digest = self.store.put_for(hospital, bytes).await?;
        self.store.pin(&digest).await?;
        Ok(digest)
    }

    /// Record an already-uploaded update's reference on the ledger.
    pub fn submit_update(
        &self,
        hospital: &AccountId,
        round: u64,
        digest: ContentDigest,
    ) -> Result<SubmissionReceipt, ServiceError> {
        let receipt = self.tracker.submit(hospital, round, digest)?;
        info!(
            hospital = %hospital,
            round,
            seq = receipt.seq,
            "model update accepted"
        );
        Ok(receipt)
    }

    /// The full participant flow: upload, pin, then submit the reference.
    pub async fn upload_and_submit(
        &self,
        hospital: &AccountId,
        round: u64,
        bytes: &[u8],
    ) -> Result<(ContentDigest, SubmissionReceipt), ServiceError> {
        let digest = self.upload_update(hospital, bytes).await?;
        let receipt = self.submit_update(hospital, round, digest.clone())?;
        Ok((digest, receipt))
    }

    /// Fetch an update's bytes from whichever backend holds them.
    pub async fn fetch_update(&self, digest: &ContentDigest) -> Result<Vec<u8>, ServiceError> {
        Ok(self.store.get(digest).await?)
    }

    // ── Administrative surface ──────────────────────────────────────

    pub fn register_hospital(
        &self,
        caller: &AccountId,
        hospital: AccountId,
    ) -> Result<TxId, ServiceError> {
        let tx = self.tracker.register(caller, hospital.clone())?;
        info!(hospital = %hospital, tx = %tx, "hospital registered");
        Ok(tx)
    }

    pub fn deregister_hospital(
        &self,
        caller: &AccountId,
        hospital: &AccountId,
    ) -> Result<TxId, ServiceError> {
        let tx = self.tracker.deregister(caller, hospital)?;
        info!(hospital = %hospital, tx = %tx, "hospital deregistered");
        Ok(tx)
    }

    /// Close the current round and hand back its submissions for
    /// aggregation.
    pub fn advance_round(&self, caller: &AccountId) -> Result<ClosedRound, ServiceError> {
        let closed = self.tracker.advance(caller)?;
        info!(
            closed_round = closed.round,
            submissions = closed.submissions.len(),
            "round closed"
        );
        Ok(closed)
    }

    /// Upload the aggregated model for a closed round, pin it, and publish
    /// its reference with an integrity hash over the raw bytes.
    pub async fn publish_global_model(
        &self,
        caller: &AccountId,
        round: u64,
        bytes: &[u8],
    ) -> Result<(ContentDigest, TxId), ServiceError> {
        let digest = self.store.put(bytes).await?;
        self.store.pin(&digest).await?;

        let integrity = *blake3::hash(bytes).as_bytes();
        let tx = self
            .tracker
            .publish_global_artifact(caller, round, digest.clone(), Some(integrity))?;
        info!(round, digest = %digest, tx = %tx, "global model published");
        Ok((digest, tx))
    }

    // ── Read surface ────────────────────────────────────────────────

    pub fn current_round(&self) -> Result<u64, ServiceError> {
        Ok(self.tracker.current_round()?)
    }

    pub fn registered_hospitals(&self) -> Result<Vec<AccountId>, ServiceError> {
        Ok(self.tracker.registered_hospitals()?)
    }

    pub fn submissions_for_round(&self, round: u64) -> Result<Vec<Submission>, ServiceError> {
        Ok(self.tracker.submissions_for_round(round)?)
    }

    pub fn submitters_for_round(&self, round: u64) -> Result<Vec<AccountId>, ServiceError> {
        Ok(self.tracker.submitters_for_round(round)?)
    }

    pub fn contribution(&self, account: &AccountId) -> Result<HospitalContribution, ServiceError> {
        Ok(self.tracker.contribution(account)?)
    }

    pub fn has_submitted(&self, round: u64, hospital: &AccountId) -> Result<bool, ServiceError> {
        Ok(self.tracker.has_submitted(round, hospital)?)
    }

    pub fn round_ready(&self) -> Result<bool, ServiceError> {
        Ok(self.tracker.ready()?)
    }

    pub fn global_artifact(&self, round: u64) -> Result<Option<GlobalArtifact>, ServiceError> {
        Ok(self.tracker.global_artifact(round)?)
    }

    pub fn latest_global_artifact(&self) -> Result<Option<GlobalArtifact>, ServiceError> {
        Ok(self.tracker.latest_global_artifact()?)
    }

    /// The latest published artifact together with its bytes.
    pub async fn latest_global_model(
        &self,
    ) -> Result<Option<(GlobalArtifact, Vec<u8>)>, ServiceError> {
        match self.tracker.latest_global_artifact()? {
            Some(artifact) => {
                let bytes = self.store.get(&artifact.digest).await?;
                Ok(Some((artifact, bytes)))
            }
            None => Ok(None),
        }
    }

    pub fn journal(&self) -> Result<Vec<TxRecord>, ServiceError> {
        Ok(self.tracker.journal()?)
    }

    pub async fn available_backends(&self) -> Vec<String> {
        self.store.available_backends().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fedcoord_coordinator::Genesis;
    use fedcoord_store::{ContentStore, InMemoryContentStore, StoreResult};
    use std::time::Duration;

    fn admin() -> AccountId {
        AccountId::new("admin")
    }

    fn hospital(name: &str) -> AccountId {
        AccountId::new(name)
    }

    struct Fixture {
        service: FederationService,
        nodes: Vec<Arc<InMemoryContentStore>>,
    }

    fn fixture(hospitals: &[&str]) -> Fixture {
        let genesis = Genesis::new(admin())
            .with_hospitals(hospitals.iter().map(|name| hospital(name)));
        let tracker = Arc::new(RoundTracker::new(genesis).unwrap());

        let mut nodes = Vec::new();
        let mut router = StoreRouter::new(Duration::from_millis(250));
        for (index, name) in hospitals.iter().enumerate() {
            let node = Arc::new(InMemoryContentStore::new());
            let endpoint = format!("node{}", index + 1);
            router = router
                .with_backend(endpoint.clone(), node.clone() as Arc<dyn ContentStore>)
                .assign(hospital(name), endpoint);
            nodes.push(node);
        }
        if nodes.is_empty() {
            let node = Arc::new(InMemoryContentStore::new());
            router = router.with_backend("node1", node.clone() as Arc<dyn ContentStore>);
            nodes.push(node);
        }

        Fixture {
            service: FederationService::new(tracker, router),
            nodes,
        }
    }

    #[tokio::test]
    async fn full_round_lifecycle() {
        let fixture = fixture(&["h1", "h2", "h3"]);
        let service = &fixture.service;

        // All three hospitals upload distinct updates and submit.
        for (index, name) in ["h1", "h2", "h3"].iter().enumerate() {
            let payload = format!("round-1 weights from {name}");
            let (digest, receipt) = service
                .upload_and_submit(&hospital(name), 1, payload.as_bytes())
                .await
                .unwrap();
            assert_eq!(receipt.round, 1);
            assert_eq!(receipt.seq, index as u64 + 1);
            assert_eq!(
                service.fetch_update(&digest).await.unwrap(),
                payload.as_bytes()
            );
        }

        assert!(service.round_ready().unwrap());
        let closed = service.advance_round(&admin()).unwrap();
        assert_eq!(closed.round, 1);
        assert_eq!(closed.submissions.len(), 3);
        assert_eq!(service.current_round().unwrap(), 2);

        // Old-round resubmission now fails with a round mismatch.
        let stale = service
            .upload_and_submit(&hospital("h1"), 1, b"stale")
            .await
            .unwrap_err();
        assert!(matches!(
            stale,
            ServiceError::Coordination(CoordinationError::RoundMismatch {
                submitted: 1,
                current: 2
            })
        ));

        // The admin aggregates and publishes the global model for round 1.
        let (digest, _) = service
            .publish_global_model(&admin(), 1, b"aggregated weights")
            .await
            .unwrap();
        let (artifact, bytes) = service.latest_global_model().await.unwrap().unwrap();
        assert_eq!(artifact.round, 1);
        assert_eq!(artifact.digest, digest);
        assert_eq!(bytes, b"aggregated weights");
    }

    #[tokio::test]
    async fn advance_blocks_until_every_hospital_submitted() {
        let fixture = fixture(&["h1", "h2", "h3"]);
        let service = &fixture.service;

        for name in ["h1", "h2"] {
            service
                .upload_and_submit(&hospital(name), 1, name.as_bytes())
                .await
                .unwrap();
        }

        let err = service.advance_round(&admin()).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Coordination(CoordinationError::RoundNotReady {
                round: 1,
                submitted: 2,
                required: 3
            })
        ));

        service
            .upload_and_submit(&hospital("h3"), 1, b"h3")
            .await
            .unwrap();
        service.advance_round(&admin()).unwrap();
        assert_eq!(service.current_round().unwrap(), 2);
    }

    #[tokio::test]
    async fn unregistered_hospital_is_rejected_until_registered() {
        let fixture = fixture(&["h1"]);
        let service = &fixture.service;

        let err = service
            .upload_and_submit(&hospital("h2"), 1, b"weights")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Coordination(CoordinationError::NotRegistered(_))
        ));

        service.register_hospital(&admin(), hospital("h2")).unwrap();
        service
            .upload_and_submit(&hospital("h2"), 1, b"weights")
            .await
            .unwrap();
        assert!(service.has_submitted(1, &hospital("h2")).unwrap());
    }

    #[tokio::test]
    async fn non_admin_calls_leave_state_unchanged() {
        let fixture = fixture(&["h1"]);
        let service = &fixture.service;

        let err = service
            .register_hospital(&hospital("h1"), hospital("h2"))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Coordination(CoordinationError::Unauthorized { .. })
        ));

        let err = service.advance_round(&hospital("h1")).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Coordination(CoordinationError::Unauthorized { .. })
        ));

        assert_eq!(service.current_round().unwrap(), 1);
        assert_eq!(service.registered_hospitals().unwrap(), vec![hospital("h1")]);
        assert!(service.journal().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_fails_over_to_a_reachable_backend() {
        let fixture = fixture(&["h1", "h2"]);
        let service = &fixture.service;

        // h1's designated node goes down; the upload lands elsewhere and the
        // digest still verifies from any backend.
        fixture.nodes[0].set_available(false);
        let (digest, _) = service
            .upload_and_submit(&hospital("h1"), 1, b"weights")
            .await
            .unwrap();
        assert_eq!(digest, ContentDigest::from_bytes(b"weights"));
        assert_eq!(service.fetch_update(&digest).await.unwrap(), b"weights");
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_ledger_entry() {
        let fixture = fixture(&["h1"]);
        let service = &fixture.service;

        fixture.nodes[0].set_available(false);
        let err = service
            .upload_and_submit(&hospital("h1"), 1, b"weights")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Unavailable(_))));

        // Upload-then-submit ordering: nothing reached the ledger.
        assert!(!service.has_submitted(1, &hospital("h1")).unwrap());
        assert!(service.submissions_for_round(1).unwrap().is_empty());
    }

    struct HangingStore;

    #[async_trait]
    impl ContentStore for HangingStore {
        async fn put(&self, _bytes: &[u8]) -> StoreResult<ContentDigest> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("put never completes")
        }

        async fn get(&self, digest: &ContentDigest) -> StoreResult<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(StoreError::NotFound(digest.clone()))
        }

        async fn pin(&self, _digest: &ContentDigest) -> StoreResult<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn health(&self) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_surfaces_a_timeout_and_submit_is_retryable() {
        let genesis = Genesis::new(admin()).with_hospital(hospital("h1"));
        let tracker = Arc::new(RoundTracker::new(genesis).unwrap());
        let healthy = Arc::new(InMemoryContentStore::new());
        let router = StoreRouter::new(Duration::from_millis(100))
            .with_backend("hung", Arc::new(HangingStore) as Arc<dyn ContentStore>)
            .assign(hospital("h1"), "hung");
        let service = FederationService::new(tracker.clone(), router);

        let err = service
            .upload_update(&hospital("h1"), b"weights")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Timeout(_))));
        assert!(!service.has_submitted(1, &hospital("h1")).unwrap());

        // The caller retries against a healthy fleet; the ledger write is
        // idempotent at the (round, hospital) key.
        let router = StoreRouter::new(Duration::from_millis(100))
            .with_backend("node1", healthy as Arc<dyn ContentStore>)
            .assign(hospital("h1"), "node1");
        let service = FederationService::new(tracker, router);
        service
            .upload_and_submit(&hospital("h1"), 1, b"weights")
            .await
            .unwrap();

        let retry = service
            .upload_and_submit(&hospital("h1"), 1, b"weights")
            .await
            .unwrap_err();
        assert!(matches!(
            retry,
            ServiceError::Coordination(CoordinationError::DuplicateSubmission { .. })
        ));
        assert!(service.has_submitted(1, &hospital("h1")).unwrap());
    }

    #[tokio::test]
    async fn uploads_run_concurrently_and_independently() {
        let fixture = fixture(&["h1", "h2", "h3"]);
        let service = &fixture.service;

        let uploads = ["h1", "h2", "h3"]
            .iter()
            .map(|name| {
                let account = hospital(name);
                let payload = format!("weights from {name}").into_bytes();
                async move { service.upload_update(&account, &payload).await }
            })
            .collect::<Vec<_>>();

        let digests = futures::future::join_all(uploads).await;
        assert!(digests.iter().all(|result| result.is_ok()));

        for (name, digest) in ["h1", "h2", "h3"].iter().zip(digests) {
            service
                .submit_update(&hospital(name), 1, digest.unwrap())
                .unwrap();
        }
        assert!(service.round_ready().unwrap());
    }
}
