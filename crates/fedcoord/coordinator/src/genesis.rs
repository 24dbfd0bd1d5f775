//! Explicit bootstrap configuration.
//!
//! Allowlist seeding is a declared parameter, never an implicit default:
//! the admin is not a hospital unless listed.

use fedcoord_types::AccountId;
use serde::{Deserialize, Serialize};

/// Initial coordination state: the admin principal and the hospitals
/// required for round 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub admin: AccountId,
    pub hospitals: Vec<AccountId>,
}

impl Genesis {
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            hospitals: Vec::new(),
        }
    }

    pub fn with_hospital(mut self, hospital: AccountId) -> Self {
        self.hospitals.push(hospital);
        self
    }

    pub fn with_hospitals(mut self, hospitals: impl IntoIterator<Item = AccountId>) -> Self {
        self.hospitals.extend(hospitals);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_hospitals() {
        let genesis = Genesis::new(AccountId::new("admin"))
            .with_hospital(AccountId::new("h1"))
            .with_hospitals([AccountId::new("h2"), AccountId::new("h3")]);

        assert_eq!(genesis.hospitals.len(), 3);
        assert_eq!(genesis.admin, AccountId::new("admin"));
    }
}
