//! Fedcoord Types - Shared identifiers and records for round coordination
//!
//! Every principal on the coordination ledger (the admin and each hospital)
//! is an opaque `AccountId`; artifacts are identified by backend-independent
//! content digests. Records here are append-only once created.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a principal on the coordination ledger.
///
/// The admin and the hospitals share one identity namespace, the way a
/// chain-backed registry keys both the owner and the allowlist by address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-independent content identifier for an uploaded artifact.
///
/// Derived from the artifact bytes alone, so any backend that holds the
/// bytes can verify the reference. Rendered as `b3:<hex>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    const DOMAIN_PREFIX: &'static [u8] = b"fedcoord-artifact-v1:";

    /// Compute the digest of an artifact's bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(Self::DOMAIN_PREFIX);
        hasher.update(bytes);
        let hash = hasher.finalize();
        Self(format!("b3:{}", hash.to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction identifier assigned to every accepted state mutation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub uuid::Uuid);

impl TxId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hospital's registration record. Created on first registration and never
/// deleted; deregistration flips `registered`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub account: AccountId,
    pub registered: bool,
    pub registered_at: DateTime<Utc>,
    pub total_contributions: u64,
    pub last_contribution_round: Option<u64>,
}

/// Read-side contribution summary for one hospital.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalContribution {
    pub registered: bool,
    pub total_contributions: u64,
    pub last_contribution_round: Option<u64>,
}

impl HospitalContribution {
    /// Summary for an account the registry has never seen.
    pub fn unknown() -> Self {
        Self {
            registered: false,
            total_contributions: 0,
            last_contribution_round: None,
        }
    }
}

/// One accepted model-update reference. Unique per (round, hospital) for the
/// lifetime of the ledger; immutable after acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub round: u64,
    pub hospital: AccountId,
    pub digest: ContentDigest,
    /// Ledger-assigned global sequence number, monotone across rounds.
    pub seq: u64,
    pub accepted_at: DateTime<Utc>,
    pub valid: bool,
}

/// Receipt returned to the submitter once a submission is on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tx: TxId,
    pub seq: u64,
    pub round: u64,
    pub hospital: AccountId,
    pub accepted_at: DateTime<Utc>,
}

/// Coordinator-published aggregate for a closed round. At most one per round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalArtifact {
    pub round: u64,
    pub digest: ContentDigest,
    /// Optional integrity hash over the raw artifact bytes, carried alongside
    /// the digest for out-of-band verification.
    pub integrity: Option<[u8; 32]>,
    pub published_at: DateTime<Utc>,
}
