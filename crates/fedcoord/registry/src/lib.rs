//! Fedcoord Registry - Hospital allowlist and contribution counters
//!
//! The registry holds the set of identities authorized to submit model
//! updates. Records are never deleted: deregistration flips a flag, history
//! and counters stay. The registry is a plain data structure — callers own
//! serialization; the round coordinator wraps it behind its single lock.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use fedcoord_types::{AccountId, HospitalContribution, HospitalRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Registry-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("hospital already registered: {0}")]
    AlreadyRegistered(AccountId),

    #[error("hospital not registered: {0}")]
    NotRegistered(AccountId),
}

/// Insertion-ordered allowlist of hospitals.
#[derive(Debug, Default)]
pub struct HospitalRegistry {
    records: HashMap<AccountId, HospitalRecord>,
    // First-registration order; retained across deregistration so `list`
    // stays stable for barrier snapshots.
    order: Vec<AccountId>,
}

impl HospitalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hospital. Re-registration of a currently-registered
    /// hospital is an error to surface, not swallow. A previously
    /// deregistered hospital is re-activated with its history intact.
    pub fn register(&mut self, account: AccountId, now: DateTime<Utc>) -> Result<(), RegistryError> {
        match self.records.get_mut(&account) {
            Some(record) if record.registered => Err(RegistryError::AlreadyRegistered(account)),
            Some(record) => {
                record.registered = true;
                Ok(())
            }
            None => {
                self.order.push(account.clone());
                self.records.insert(
                    account.clone(),
                    HospitalRecord {
                        account,
                        registered: true,
                        registered_at: now,
                        total_contributions: 0,
                        last_contribution_round: None,
                    },
                );
                Ok(())
            }
        }
    }

    /// Deregister a hospital. History is kept; past submissions stay valid.
    pub fn deregister(&mut self, account: &AccountId) -> Result<(), RegistryError> {
        match self.records.get_mut(account) {
            Some(record) if record.registered => {
                record.registered = false;
                Ok(())
            }
            _ => Err(RegistryError::NotRegistered(account.clone())),
        }
    }

    pub fn is_registered(&self, account: &AccountId) -> bool {
        self.records
            .get(account)
            .map(|record| record.registered)
            .unwrap_or(false)
    }

    /// Currently-registered hospitals in first-registration order.
    pub fn list(&self) -> Vec<AccountId> {
        self.order
            .iter()
            .filter(|account| self.is_registered(account))
            .cloned()
            .collect()
    }

    /// Number of currently-registered hospitals.
    pub fn len(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.registered)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&self, account: &AccountId) -> Option<&HospitalRecord> {
        self.records.get(account)
    }

    /// Contribution summary; unknown accounts read as unregistered with
    /// zeroed counters.
    pub fn contribution(&self, account: &AccountId) -> HospitalContribution {
        match self.records.get(account) {
            Some(record) => HospitalContribution {
                registered: record.registered,
                total_contributions: record.total_contributions,
                last_contribution_round: record.last_contribution_round,
            },
            None => HospitalContribution::unknown(),
        }
    }

    /// Bump counters after an accepted submission.
    pub fn record_contribution(
        &mut self,
        account: &AccountId,
        round: u64,
    ) -> Result<(), RegistryError> {
        let record = self
            .records
            .get_mut(account)
            .filter(|record| record.registered)
            .ok_or_else(|| RegistryError::NotRegistered(account.clone()))?;

        record.total_contributions += 1;
        record.last_contribution_round = Some(round);
        Ok(())
    }
}
