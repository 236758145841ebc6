//! Client core for a two-party tic-tac-toe whose authoritative state lives
//! on an external ledger.
//!
//! The crate mirrors remote game state locally, submits moves
//! optimistically before their confirmation is known, reconciles the
//! speculative overlay against refreshed authoritative state, and filters
//! the roster of live sessions down to what the local actor should see.
//! All ledger access goes through the [`gateway::LedgerGateway`] trait;
//! [`ledger::MemoryLedger`] is the in-process implementation used by the
//! local mode and the test suites.

pub mod catalog;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod moves;
pub mod sync;
pub mod types;

pub mod test_helpers;
