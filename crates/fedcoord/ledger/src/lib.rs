//! Fedcoord Ledger - Append-only per-round submission record
//!
//! One submission per (round, hospital) pair, ever. Entries are immutable
//! after acceptance and ordered by acceptance within each round. Like the
//! registry, this is a plain data structure; the round coordinator provides
//! the single serialization point.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use fedcoord_types::{AccountId, ContentDigest, Submission};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Ledger-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate submission for round {round} from {hospital}")]
    DuplicateSubmission { round: u64, hospital: AccountId },

    #[error("invalid round number: {0} (rounds start at 1)")]
    InvalidRound(u64),
}

/// Append-only record of accepted submissions, keyed by (round, hospital).
#[derive(Debug, Default)]
pub struct RoundLedger {
    rounds: BTreeMap<u64, Vec<Submission>>,
    index: HashSet<(u64, AccountId)>,
    next_seq: u64,
    last_accepted_at: Option<DateTime<Utc>>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a submission. The (round, hospital) pair must be unseen;
    /// acceptance timestamps are clamped monotone non-decreasing.
    pub fn append(
        &mut self,
        round: u64,
        hospital: AccountId,
        digest: ContentDigest,
        now: DateTime<Utc>,
    ) -> Result<Submission, LedgerError> {
        if round == 0 {
            return Err(LedgerError::InvalidRound(round));
        }

        let key = (round, hospital.clone());
        if self.index.contains(&key) {
            return Err(LedgerError::DuplicateSubmission { round, hospital });
        }

        self.next_seq += 1;
        let accepted_at = match self.last_accepted_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_accepted_at = Some(accepted_at);

        let submission = Submission {
            round,
            hospital,
            digest,
            seq: self.next_seq,
            accepted_at,
            valid: true,
        };

        self.index.insert(key);
        self.rounds.entry(round).or_default().push(submission.clone());
        Ok(submission)
    }

    /// Submissions for a round in acceptance order.
    pub fn submissions(&self, round: u64) -> &[Submission] {
        self.rounds.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hospitals that submitted for a round, in acceptance order.
    pub fn submitters(&self, round: u64) -> Vec<AccountId> {
        self.submissions(round)
            .iter()
            .map(|submission| submission.hospital.clone())
            .collect()
    }

    pub fn submission(&self, round: u64, hospital: &AccountId) -> Option<&Submission> {
        self.submissions(round)
            .iter()
            .find(|submission| &submission.hospital == hospital)
    }

    pub fn has_submitted(&self, round: u64, hospital: &AccountId) -> bool {
        self.index.contains(&(round, hospital.clone()))
    }

    pub fn submission_count(&self, round: u64) -> usize {
        self.submissions(round).len()
    }

    /// Total accepted submissions across all rounds.
    pub fn total_submissions(&self) -> usize {
        self.index.len()
    }
}
