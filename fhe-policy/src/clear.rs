//! Plaintext stub provider with a local decryption oracle.
//!
//! `ClearProvider` keeps values in the clear behind an opaque handle. It exists so the
//! ledger can run end to end (tests, local development) without a real FHE backend.
//!
//! Arithmetic wraps modulo 2^64 and division truncates, which for unsigned operands is the
//! same as flooring.
//!
//! Decryption proofs are a Poseidon digest over BN254 keyed by a secret oracle key:
//! `H(key, request_id_hi, request_id_lo, cleartexts...)`. Anyone holding the provider can
//! verify; only the provider can produce them.

use crate::constants::poseidon_config;
use crate::provider::{DecryptionOracle, DecryptionProof, FheError, FheProvider, RequestId};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::{Mutex, PoisonError};

/// Opaque handle. The wrapped value is never exposed outside this module.
#[derive(Clone, PartialEq, Eq)]
pub struct ClearCiphertext(u64);

impl fmt::Debug for ClearCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClearCiphertext(..)")
    }
}

/// A batch submitted to the local oracle, waiting to be decrypted.
#[derive(Clone, Debug)]
pub struct DecryptionJob {
    pub request_id: RequestId,
    ciphertexts: Vec<ClearCiphertext>,
}

/// What the oracle sends back: cleartexts in submission order plus a proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecryptionCallback {
    pub request_id: RequestId,
    pub cleartexts: Vec<u64>,
    pub proof: DecryptionProof,
}

pub struct ClearProvider {
    oracle_key: Fr,
    poseidon: PoseidonConfig<Fr>,
    jobs: Mutex<VecDeque<DecryptionJob>>,
}

impl ClearProvider {
    /// Build a provider whose oracle key is derived from `seed`.
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            oracle_key: Fr::from_le_bytes_mod_order(&seed),
            poseidon: poseidon_config(),
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn random(rng: &mut impl RngCore) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::new(seed)
    }

    /// Client-side encryption.
    pub fn encrypt(&self, value: u64) -> ClearCiphertext {
        ClearCiphertext(value)
    }

    /// Take every queued job, oldest first.
    pub fn drain_jobs(&self) -> Vec<DecryptionJob> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.drain(..).collect()
    }

    pub fn queued_jobs(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Decrypt a job and sign the result.
    pub fn fulfil(&self, job: &DecryptionJob) -> Result<DecryptionCallback, FheError> {
        let cleartexts: Vec<u64> = job.ciphertexts.iter().map(|c| c.0).collect();
        let proof = self.proof_for(job.request_id, &cleartexts)?;
        Ok(DecryptionCallback {
            request_id: job.request_id,
            cleartexts,
            proof,
        })
    }

    fn digest(&self, request_id: RequestId, cleartexts: &[u64]) -> Fr {
        let (hi, lo) = request_id.0.as_u64_pair();

        let mut sponge = PoseidonSponge::<Fr>::new(&self.poseidon);
        sponge.absorb(&self.oracle_key);
        sponge.absorb(&Fr::from(hi));
        sponge.absorb(&Fr::from(lo));
        for v in cleartexts {
            sponge.absorb(&Fr::from(*v));
        }
        sponge.squeeze_field_elements::<Fr>(1)[0]
    }

    fn proof_for(
        &self,
        request_id: RequestId,
        cleartexts: &[u64],
    ) -> Result<DecryptionProof, FheError> {
        let mut bytes = Vec::new();
        self.digest(request_id, cleartexts)
            .serialize_compressed(&mut bytes)
            .map_err(|e| FheError::Oracle(format!("proof encoding failed: {e}")))?;
        Ok(DecryptionProof(bytes))
    }
}

impl FheProvider for ClearProvider {
    type Ciphertext = ClearCiphertext;

    fn encrypt_const(&self, value: u64) -> ClearCiphertext {
        ClearCiphertext(value)
    }

    fn add(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        ClearCiphertext(a.0.wrapping_add(b.0))
    }

    fn sub(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        ClearCiphertext(a.0.wrapping_sub(b.0))
    }

    fn mul(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        ClearCiphertext(a.0.wrapping_mul(b.0))
    }

    fn div(&self, a: &ClearCiphertext, divisor: NonZeroU64) -> ClearCiphertext {
        ClearCiphertext(a.0 / divisor.get())
    }

    fn serialize(&self, ct: &ClearCiphertext) -> Vec<u8> {
        ct.0.to_le_bytes().to_vec()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ClearCiphertext, FheError> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            FheError::InvalidCiphertext(format!("expected 8 bytes, got {}", bytes.len()))
        })?;
        Ok(ClearCiphertext(u64::from_le_bytes(raw)))
    }
}

impl DecryptionOracle<ClearCiphertext> for ClearProvider {
    fn submit(&self, ciphertexts: &[ClearCiphertext]) -> Result<RequestId, FheError> {
        let request_id = RequestId::new_v4();
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(DecryptionJob {
                request_id,
                ciphertexts: ciphertexts.to_vec(),
            });
        Ok(request_id)
    }

    fn verify(&self, request_id: RequestId, cleartexts: &[u64], proof: &DecryptionProof) -> bool {
        match self.proof_for(request_id, cleartexts) {
            Ok(expected) => expected == *proof,
            Err(_) => false,
        }
    }
}
