use crate::provider::{FheError, RequestId};
use crate::types::TargetKind;
use thiserror::Error;

/// Per-call failures. None of them leave shared state partially updated.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{kind} {id} not found")]
    NotFound { kind: TargetKind, id: u64 },

    #[error("invalid policy id {0}")]
    InvalidPolicy(u64),

    #[error("{kind} {id} is already revealed")]
    AlreadyRevealed { kind: TargetKind, id: u64 },

    #[error("{kind} {id} already has a pending reveal request")]
    RevealPending { kind: TargetKind, id: u64 },

    #[error("unknown decryption request {0}")]
    UnknownRequest(RequestId),

    #[error("decryption proof rejected for request {0}")]
    InvalidProof(RequestId),

    #[error("simulation of policy {policy_id} over {citizens} citizens superseded by one over {newer}")]
    SimulationSuperseded { policy_id: u64, citizens: u64, newer: u64 },

    #[error("expected {expected} cleartext values, got {got}")]
    WrongArity { expected: usize, got: usize },

    #[error(transparent)]
    Fhe(#[from] FheError),
}
