//! Capability traits for the external homomorphic-computation provider.
//!
//! The ledger never inspects ciphertext internals. Everything it does with an encrypted
//! value goes through `FheProvider`; everything it learns about plaintexts comes through a
//! `DecryptionOracle` callback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::num::NonZeroU64;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FheError {
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("decryption oracle error: {0}")]
    Oracle(String),
}

/// Identifier handed out by the decryption oracle for one submitted batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Authenticity proof attached to an oracle callback. Hex-encoded on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecryptionProof(#[serde(with = "hex::serde")] pub Vec<u8>);

impl DecryptionProof {
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// Homomorphic operations over opaque 64-bit encrypted integers.
pub trait FheProvider: Send + Sync {
    /// Handle type. Only equality of handles is observable.
    type Ciphertext: Clone + Eq + Debug + Send + Sync;

    /// Trivially encrypt a public constant.
    fn encrypt_const(&self, value: u64) -> Self::Ciphertext;

    fn encrypt_zero(&self) -> Self::Ciphertext {
        self.encrypt_const(0)
    }

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    fn mul(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    /// Divide by a public scalar. Rounding is provider-defined.
    fn div(&self, a: &Self::Ciphertext, divisor: NonZeroU64) -> Self::Ciphertext;

    /// Transport encoding of a handle.
    fn serialize(&self, ct: &Self::Ciphertext) -> Vec<u8>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Ciphertext, FheError>;
}

/// Out-of-band decryption service.
///
/// `submit` must return immediately; the cleartexts arrive later through whatever channel
/// the caller wires to `PolicyLedger::finalize_reveal`.
pub trait DecryptionOracle<C>: Send + Sync {
    fn submit(&self, ciphertexts: &[C]) -> Result<RequestId, FheError>;

    fn verify(&self, request_id: RequestId, cleartexts: &[u64], proof: &DecryptionProof) -> bool;
}
