//! Round barrier: the readiness condition gating round advancement.
//!
//! The required set is snapshotted when a round opens and frozen at the
//! round's first accepted submission: registrations before any submission
//! still join (so a freshly-bootstrapped deployment can close round 1),
//! later ones wait for the next round. While the set can still grow the
//! barrier is trivially unsatisfied, so readiness never flips true→false.

use fedcoord_types::AccountId;
use std::collections::HashSet;

/// Required-participant snapshot for one open round.
#[derive(Clone, Debug)]
pub struct RoundBarrier {
    round: u64,
    required: Vec<AccountId>,
    index: HashSet<AccountId>,
}

impl RoundBarrier {
    /// Snapshot the required set at round start.
    pub fn snapshot(round: u64, hospitals: impl IntoIterator<Item = AccountId>) -> Self {
        let mut required = Vec::new();
        let mut index = HashSet::new();
        for hospital in hospitals {
            if index.insert(hospital.clone()) {
                required.push(hospital);
            }
        }
        Self {
            round,
            required,
            index,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn required(&self) -> &[AccountId] {
        &self.required
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn contains(&self, hospital: &AccountId) -> bool {
        self.index.contains(hospital)
    }

    /// Add a hospital to the required set. Only legal before the round's
    /// first submission; the tracker enforces the freeze.
    pub fn insert(&mut self, hospital: AccountId) -> bool {
        if self.index.insert(hospital.clone()) {
            self.required.push(hospital);
            true
        } else {
            false
        }
    }

    /// Drop a hospital from the required set (deregistration mid-round).
    pub fn remove(&mut self, hospital: &AccountId) -> bool {
        if self.index.remove(hospital) {
            self.required.retain(|required| required != hospital);
            true
        } else {
            false
        }
    }

    /// The barrier holds iff every required hospital satisfies `submitted`
    /// and the required set is non-empty. An empty round never closes.
    pub fn ready(&self, mut submitted: impl FnMut(&AccountId) -> bool) -> bool {
        !self.required.is_empty() && self.required.iter().all(|hospital| submitted(hospital))
    }

    /// Required hospitals that `submitted` does not yet cover.
    pub fn missing(&self, mut submitted: impl FnMut(&AccountId) -> bool) -> Vec<AccountId> {
        self.required
            .iter()
            .filter(|hospital| !submitted(hospital))
            .cloned()
            .collect()
    }
}
