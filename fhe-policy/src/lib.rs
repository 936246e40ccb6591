//! Encrypted policy-simulation ledger.
//!
//! This crate contains:
//! - An opaque ciphertext capability (`FheProvider`) and decryption oracle interface.
//! - A plaintext stub provider with a local, Poseidon-authenticated decryption oracle.
//! - The encrypted record store, the homomorphic aggregation engine and the two-phase
//!   reveal protocol, composed into a single sequentially-consistent `PolicyLedger`.

pub mod aggregation;
pub mod clear;
pub mod constants;
pub mod error;
pub mod events;
pub mod ledger;
pub mod provider;
pub mod reveal;
pub mod store;
pub mod types;

pub use error::LedgerError;
pub use ledger::{LedgerConfig, PolicyLedger};
