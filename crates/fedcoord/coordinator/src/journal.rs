//! Hash-linked journal of accepted coordination transactions.
//!
//! The journal models the external append-only log: one global ordering,
//! dense sequence numbers, each entry linked to its predecessor by hash.
//! Only accepted mutations are journaled; rejected calls leave no trace.

use crate::error::CoordinationError;
use chrono::{DateTime, Utc};
use fedcoord_types::{AccountId, ContentDigest, TxId};
use serde::{Deserialize, Serialize};

/// The mutation a journal entry records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOp {
    RegisterHospital {
        hospital: AccountId,
    },
    DeregisterHospital {
        hospital: AccountId,
    },
    SubmitUpdate {
        round: u64,
        hospital: AccountId,
        digest: ContentDigest,
    },
    AdvanceRound {
        closed_round: u64,
        submissions: usize,
    },
    PublishGlobalArtifact {
        round: u64,
        digest: ContentDigest,
    },
}

/// One accepted transaction. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub seq: u64,
    pub tx: TxId,
    pub recorded_at: DateTime<Utc>,
    pub op: TxOp,
    pub entry_hash: [u8; 32],
    pub prev_hash: Option<[u8; 32]>,
}

#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<TxRecord>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted mutation and return its record.
    pub fn append(
        &mut self,
        op: TxOp,
        recorded_at: DateTime<Utc>,
    ) -> Result<TxRecord, CoordinationError> {
        let mut record = TxRecord {
            seq: self.entries.len() as u64 + 1,
            tx: TxId::generate(),
            recorded_at,
            op,
            entry_hash: [0; 32],
            prev_hash: self.entries.last().map(|entry| entry.entry_hash),
        };
        record.entry_hash = entry_hash(&record)?;

        self.entries.push(record.clone());
        Ok(record)
    }

    pub fn entries(&self) -> &[TxRecord] {
        &self.entries
    }

    pub fn head(&self) -> Option<&TxRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk the chain: dense sequence numbers, intact prev links, and entry
    /// hashes that recompute from content.
    pub fn verify(&self) -> Result<(), CoordinationError> {
        for (index, entry) in self.entries.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            if entry.seq != expected_seq {
                return Err(CoordinationError::JournalIntegrity {
                    seq: entry.seq,
                    reason: format!("expected seq {expected_seq}"),
                });
            }

            let expected_prev = if index == 0 {
                None
            } else {
                Some(self.entries[index - 1].entry_hash)
            };
            if entry.prev_hash != expected_prev {
                return Err(CoordinationError::JournalIntegrity {
                    seq: entry.seq,
                    reason: "previous hash link mismatch".to_string(),
                });
            }

            if entry_hash(entry)? != entry.entry_hash {
                return Err(CoordinationError::JournalIntegrity {
                    seq: entry.seq,
                    reason: "entry hash mismatch".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn entry_hash(record: &TxRecord) -> Result<[u8; 32], CoordinationError> {
    let mut canonical = record.clone();
    canonical.entry_hash = [0; 32];

    let encoded = serde_json::to_vec(&canonical)
        .map_err(|error| CoordinationError::Internal(error.to_string()))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(b"fedcoord-journal-v1:");
    hasher.update(&encoded);
    Ok(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_op(name: &str) -> TxOp {
        TxOp::RegisterHospital {
            hospital: AccountId::new(name),
        }
    }

    #[test]
    fn entries_chain_by_hash() {
        let mut journal = Journal::new();
        let first = journal.append(register_op("h1"), Utc::now()).unwrap();
        let second = journal.append(register_op("h2"), Utc::now()).unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(first.prev_hash, None);
        assert_eq!(second.seq, 2);
        assert_eq!(second.prev_hash, Some(first.entry_hash));
        journal.verify().unwrap();
    }

    #[test]
    fn verify_detects_tampering() {
        let mut journal = Journal::new();
        journal.append(register_op("h1"), Utc::now()).unwrap();
        journal
            .append(
                TxOp::AdvanceRound {
                    closed_round: 1,
                    submissions: 3,
                },
                Utc::now(),
            )
            .unwrap();

        if let TxOp::AdvanceRound { submissions, .. } = &mut journal.entries[1].op {
            *submissions = 99;
        }

        let err = journal.verify().unwrap_err();
        assert!(matches!(
            err,
            CoordinationError::JournalIntegrity { seq: 2, .. }
        ));
    }

    #[test]
    fn empty_journal_verifies() {
        Journal::new().verify().unwrap();
    }
}
