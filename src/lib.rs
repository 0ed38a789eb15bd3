//! A two-asset liquidity pool priced at the spot ratio of its reserves,
//! with a router that keeps one pool per unordered asset pair.
//!
//! The engine in [`pool`] is written against the ledger traits in
//! [`ledger`]. On chain, [`processor`] runs it over SPL token accounts
//! ([`token_ledger`]); off chain, [`router::Router`] runs it over an
//! in-memory ledger.

pub mod error;
pub mod event;
pub mod instruction;
pub mod ledger;
pub mod math;
pub mod pool;
pub mod processor;
pub mod router;
pub mod state;
pub mod token_ledger;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;
