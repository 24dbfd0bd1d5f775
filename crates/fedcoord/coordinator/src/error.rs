use fedcoord_ledger::LedgerError;
use fedcoord_registry::RegistryError;
use fedcoord_types::AccountId;
use thiserror::Error;

/// Errors surfaced by the round coordination surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("unauthorized: {caller} is not the admin")]
    Unauthorized { caller: AccountId },

    #[error("not registered: {0}")]
    NotRegistered(AccountId),

    #[error("hospital already registered: {0}")]
    AlreadyRegistered(AccountId),

    #[error("round mismatch: targeted round {submitted}, current round is {current}")]
    RoundMismatch { submitted: u64, current: u64 },

    #[error("duplicate submission for round {round} from {hospital}")]
    DuplicateSubmission { round: u64, hospital: AccountId },

    #[error("round {round} is not ready to close: {submitted}/{required} required submissions")]
    RoundNotReady {
        round: u64,
        submitted: usize,
        required: usize,
    },

    #[error("global artifact already published for round {round}")]
    ArtifactAlreadyPublished { round: u64 },

    #[error("journal integrity violation at seq {seq}: {reason}")]
    JournalIntegrity { seq: u64, reason: String },

    #[error("internal coordination error: {0}")]
    Internal(String),
}

impl From<RegistryError> for CoordinationError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::AlreadyRegistered(account) => Self::AlreadyRegistered(account),
            RegistryError::NotRegistered(account) => Self::NotRegistered(account),
        }
    }
}

impl From<LedgerError> for CoordinationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::DuplicateSubmission { round, hospital } => {
                Self::DuplicateSubmission { round, hospital }
            }
            LedgerError::InvalidRound(round) => {
                Self::Internal(format!("ledger rejected round {round}"))
            }
        }
    }
}
