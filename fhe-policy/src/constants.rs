//! Crate-wide constants used by the aggregation engine and the local oracle.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;
use std::num::NonZeroU64;

/// Basis-point base the tax rate is subtracted from.
pub const EFFECT_BASE: u64 = 10_000;

/// Divisor applied to every citizen's partial effect.
pub const EFFECT_SCALE: NonZeroU64 = match NonZeroU64::new(100) {
    Some(v) => v,
    None => panic!("scale must be non-zero"),
};

/// Number of encrypted fields bundled into one reveal request.
pub const REVEAL_ARITY: usize = 4;

// Poseidon sponge configuration for the oracle's decryption proofs.
//
// Width-3 sponge (rate=2, capacity=1), same shape as widely used BN254 instantiations.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;
pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
///
/// The oracle and every verifier must agree on these constants, so they are derived
/// rather than configured.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}
