//! Demo node for the livestock cold-storage marketplace.
//!
//! Hosts one session's marketplace in memory behind a JSON HTTP API and
//! runs the simulated escrow payments and booking settlement alongside it.

pub mod config;
pub mod error;
pub mod payment;
pub mod routes;
pub mod state;
