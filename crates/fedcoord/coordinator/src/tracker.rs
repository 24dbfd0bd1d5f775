//! The round tracker: single authority over registration, admission, the
//! round counter, and artifact publication.
//!
//! All mutations and reads go through one lock, giving the single global
//! ordering the coordination contract requires: a submission can never land
//! in a round after its close begins committing, and two submissions racing
//! on one (round, hospital) key resolve to exactly one winner.

use crate::barrier::RoundBarrier;
use crate::error::CoordinationError;
use crate::genesis::Genesis;
use crate::journal::{Journal, TxOp, TxRecord};
use chrono::Utc;
use fedcoord_ledger::RoundLedger;
use fedcoord_registry::HospitalRegistry;
use fedcoord_types::{
    AccountId, ContentDigest, GlobalArtifact, HospitalContribution, Submission,
    SubmissionReceipt, TxId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result of closing a round: the submissions handed to aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedRound {
    pub round: u64,
    pub submissions: Vec<Submission>,
    pub tx: TxId,
}

#[derive(Debug)]
struct TrackerState {
    admin: AccountId,
    registry: HospitalRegistry,
    ledger: RoundLedger,
    current_round: u64,
    barrier: RoundBarrier,
    artifacts: BTreeMap<u64, GlobalArtifact>,
    journal: Journal,
}

/// The coordination contract. Initial state: round 1 open, required set
/// snapshotted from the genesis allowlist.
#[derive(Debug)]
pub struct RoundTracker {
    inner: RwLock<TrackerState>,
}

impl RoundTracker {
    pub fn new(genesis: Genesis) -> Result<Self, CoordinationError> {
        let now = Utc::now();
        let mut registry = HospitalRegistry::new();
        for hospital in genesis.hospitals {
            registry.register(hospital, now)?;
        }

        let barrier = RoundBarrier::snapshot(1, registry.list());
        Ok(Self {
            inner: RwLock::new(TrackerState {
                admin: genesis.admin,
                registry,
                ledger: RoundLedger::new(),
                current_round: 1,
                barrier,
                artifacts: BTreeMap::new(),
                journal: Journal::new(),
            }),
        })
    }

    // ── Administrative surface ──────────────────────────────────────

    /// Register a hospital. Admin-only. The newcomer joins the current
    /// round's required set only while that round has no submissions yet;
    /// once the first submission lands the set is frozen and registration
    /// counts from the next round.
    pub fn register(
        &self,
        caller: &AccountId,
        hospital: AccountId,
    ) -> Result<TxId, CoordinationError> {
        let mut state = self.write()?;
        state.require_admin(caller)?;

        let now = Utc::now();
        state.registry.register(hospital.clone(), now)?;
        if state.ledger.submission_count(state.current_round) == 0 {
            state.barrier.insert(hospital.clone());
        }

        let record = state
            .journal
            .append(TxOp::RegisterHospital { hospital }, now)?;
        Ok(record.tx)
    }

    /// Deregister a hospital. Admin-only; history and past submissions stay
    /// valid. If the hospital owed the current round a submission, the
    /// requirement is dropped so the round stays closable.
    pub fn deregister(
        &self,
        caller: &AccountId,
        hospital: &AccountId,
    ) -> Result<TxId, CoordinationError> {
        let mut state = self.write()?;
        state.require_admin(caller)?;

        state.registry.deregister(hospital)?;
        let round = state.current_round;
        if !state.ledger.has_submitted(round, hospital) {
            state.barrier.remove(hospital);
        }

        let record = state.journal.append(
            TxOp::DeregisterHospital {
                hospital: hospital.clone(),
            },
            Utc::now(),
        )?;
        Ok(record.tx)
    }

    /// Close the current round. Admin-only; fails unless every required
    /// hospital has submitted (zero submissions never satisfy the barrier).
    /// Returns the closed round's submissions for downstream aggregation.
    pub fn advance(&self, caller: &AccountId) -> Result<ClosedRound, CoordinationError> {
        let mut state = self.write()?;
        state.require_admin(caller)?;

        let round = state.current_round;
        let ledger = &state.ledger;
        if !state.barrier.ready(|h| ledger.has_submitted(round, h)) {
            let missing = state.barrier.missing(|h| ledger.has_submitted(round, h));
            return Err(CoordinationError::RoundNotReady {
                round,
                submitted: state.barrier.len() - missing.len(),
                required: state.barrier.len(),
            });
        }

        let submissions = state.ledger.submissions(round).to_vec();
        let next_round = round + 1;
        let next_barrier = RoundBarrier::snapshot(next_round, state.registry.list());
        state.current_round = next_round;
        state.barrier = next_barrier;

        let record = state.journal.append(
            TxOp::AdvanceRound {
                closed_round: round,
                submissions: submissions.len(),
            },
            Utc::now(),
        )?;

        Ok(ClosedRound {
            round,
            submissions,
            tx: record.tx,
        })
    }

    /// Publish the aggregated artifact for a closed round. Admin-only,
    /// single-shot per round.
    pub fn publish_global_artifact(
        &self,
        caller: &AccountId,
        round: u64,
        digest: ContentDigest,
        integrity: Option<[u8; 32]>,
    ) -> Result<TxId, CoordinationError> {
        let mut state = self.write()?;
        state.require_admin(caller)?;

        if round >= state.current_round {
            return Err(CoordinationError::RoundMismatch {
                submitted: round,
                current: state.current_round,
            });
        }
        if state.artifacts.contains_key(&round) {
            return Err(CoordinationError::ArtifactAlreadyPublished { round });
        }

        let now = Utc::now();
        state.artifacts.insert(
            round,
            GlobalArtifact {
                round,
                digest: digest.clone(),
                integrity,
                published_at: now,
            },
        );
        let record = state
            .journal
            .append(TxOp::PublishGlobalArtifact { round, digest }, now)?;
        Ok(record.tx)
    }

    // ── Submission admission ────────────────────────────────────────

    /// Record a model-update reference for the caller. Preconditions in
    /// order, first failure wins: registration, round match, uniqueness.
    pub fn submit(
        &self,
        caller: &AccountId,
        round: u64,
        digest: ContentDigest,
    ) -> Result<SubmissionReceipt, CoordinationError> {
        let mut state = self.write()?;

        if !state.registry.is_registered(caller) {
            return Err(CoordinationError::NotRegistered(caller.clone()));
        }
        if round != state.current_round {
            return Err(CoordinationError::RoundMismatch {
                submitted: round,
                current: state.current_round,
            });
        }

        let submission = state
            .ledger
            .append(round, caller.clone(), digest.clone(), Utc::now())?;
        state
            .registry
            .record_contribution(caller, round)
            .map_err(|error| CoordinationError::Internal(error.to_string()))?;

        let record = state.journal.append(
            TxOp::SubmitUpdate {
                round,
                hospital: caller.clone(),
                digest,
            },
            submission.accepted_at,
        )?;

        Ok(SubmissionReceipt {
            tx: record.tx,
            seq: submission.seq,
            round,
            hospital: caller.clone(),
            accepted_at: submission.accepted_at,
        })
    }

    // ── Read surface ────────────────────────────────────────────────

    pub fn admin(&self) -> Result<AccountId, CoordinationError> {
        Ok(self.read()?.admin.clone())
    }

    pub fn current_round(&self) -> Result<u64, CoordinationError> {
        Ok(self.read()?.current_round)
    }

    pub fn registered_hospitals(&self) -> Result<Vec<AccountId>, CoordinationError> {
        Ok(self.read()?.registry.list())
    }

    /// The snapshot the current round's barrier is measured against.
    pub fn required_hospitals(&self) -> Result<Vec<AccountId>, CoordinationError> {
        Ok(self.read()?.barrier.required().to_vec())
    }

    pub fn submissions_for_round(&self, round: u64) -> Result<Vec<Submission>, CoordinationError> {
        Ok(self.read()?.ledger.submissions(round).to_vec())
    }

    pub fn submitters_for_round(&self, round: u64) -> Result<Vec<AccountId>, CoordinationError> {
        Ok(self.read()?.ledger.submitters(round))
    }

    pub fn submission(
        &self,
        round: u64,
        hospital: &AccountId,
    ) -> Result<Option<Submission>, CoordinationError> {
        Ok(self.read()?.ledger.submission(round, hospital).cloned())
    }

    /// Pure read for idempotent client retries.
    pub fn has_submitted(&self, round: u64, hospital: &AccountId) -> Result<bool, CoordinationError> {
        Ok(self.read()?.ledger.has_submitted(round, hospital))
    }

    pub fn contribution(&self, account: &AccountId) -> Result<HospitalContribution, CoordinationError> {
        Ok(self.read()?.registry.contribution(account))
    }

    /// Whether the current round's barrier holds.
    pub fn ready(&self) -> Result<bool, CoordinationError> {
        let state = self.read()?;
        let round = state.current_round;
        let ledger = &state.ledger;
        Ok(state.barrier.ready(|h| ledger.has_submitted(round, h)))
    }

    pub fn global_artifact(&self, round: u64) -> Result<Option<GlobalArtifact>, CoordinationError> {
        Ok(self.read()?.artifacts.get(&round).cloned())
    }

    /// The most recently closed round's published artifact, if any.
    pub fn latest_global_artifact(&self) -> Result<Option<GlobalArtifact>, CoordinationError> {
        Ok(self.read()?.artifacts.values().next_back().cloned())
    }

    pub fn journal(&self) -> Result<Vec<TxRecord>, CoordinationError> {
        Ok(self.read()?.journal.entries().to_vec())
    }

    pub fn verify_journal(&self) -> Result<(), CoordinationError> {
        self.read()?.journal.verify()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TrackerState>, CoordinationError> {
        self.inner
            .read()
            .map_err(|_| CoordinationError::Internal("tracker lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TrackerState>, CoordinationError> {
        self.inner
            .write()
            .map_err(|_| CoordinationError::Internal("tracker lock poisoned".to_string()))
    }
}

impl TrackerState {
    fn require_admin(&self, caller: &AccountId) -> Result<(), CoordinationError> {
        if caller != &self.admin {
            return Err(CoordinationError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}
