//! Fedcoord Coordinator - Round barrier, admission control, and journal
//!
//! This crate provides:
//! - the `RoundTracker` contract surface: registration, submission
//!   admission, round advancement, artifact publication
//! - the `RoundBarrier` readiness predicate with snapshot-at-round-start
//!   required sets
//! - explicit `Genesis` bootstrap (no implicit deployer allowlisting)
//! - a hash-linked journal of accepted transactions with an integrity walk

#![deny(unsafe_code)]

mod barrier;
mod error;
mod genesis;
pub mod journal;
mod tracker;

pub use barrier::RoundBarrier;
pub use error::CoordinationError;
pub use genesis::Genesis;
pub use journal::{Journal, TxOp, TxRecord};
pub use tracker::{ClosedRound, RoundTracker};
