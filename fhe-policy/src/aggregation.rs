//! Homomorphic policy-effect aggregation.
//!
//! For every citizen:
//!
//! ```text
//! partial = (healthcare_funding * health + education_investment * education
//!            + (EFFECT_BASE - tax_rate)) / EFFECT_SCALE
//! ```
//!
//! and the effect index is the sum of all partials. Every step runs through the provider;
//! rounding and overflow behaviour are whatever the provider defines.

use crate::constants::{EFFECT_BASE, EFFECT_SCALE};
use crate::provider::FheProvider;
use crate::types::PolicyInputs;

/// The two citizen attributes the effect formula reads.
#[derive(Clone, Debug)]
pub struct CitizenFactors<C> {
    pub health: C,
    pub education: C,
}

/// One citizen's encrypted contribution.
///
/// `headroom` is `EFFECT_BASE - tax_rate`, computed once per policy.
pub fn citizen_contribution<P: FheProvider>(
    provider: &P,
    policy: &PolicyInputs<P::Ciphertext>,
    headroom: &P::Ciphertext,
    citizen: &CitizenFactors<P::Ciphertext>,
) -> P::Ciphertext {
    let health = provider.mul(&policy.healthcare_funding, &citizen.health);
    let education = provider.mul(&policy.education_investment, &citizen.education);
    let weighted = provider.add(&provider.add(&health, &education), headroom);
    provider.div(&weighted, EFFECT_SCALE)
}

/// Full recomputation over `citizens`. An empty population yields encrypted zero.
pub fn aggregate_effect<P: FheProvider>(
    provider: &P,
    policy: &PolicyInputs<P::Ciphertext>,
    citizens: &[CitizenFactors<P::Ciphertext>],
) -> P::Ciphertext {
    let base = provider.encrypt_const(EFFECT_BASE);
    let headroom = provider.sub(&base, &policy.tax_rate);

    citizens.iter().fold(provider.encrypt_zero(), |total, citizen| {
        let partial = citizen_contribution(provider, policy, &headroom, citizen);
        provider.add(&total, &partial)
    })
}
