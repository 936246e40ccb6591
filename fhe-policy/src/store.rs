//! Append-only record tables for citizens and policies.
//!
//! Ids are dense and 1-based; id `n` lives at index `n - 1`. The two tables have
//! independent counters. Nothing is ever removed, so `1..=count` is an authoritative
//! enumeration range.

use crate::aggregation::CitizenFactors;
use crate::constants::REVEAL_ARITY;
use crate::error::LedgerError;
use crate::types::{CitizenInputs, CitizenRecord, PolicyInputs, PolicyRecord, TargetKind};
use chrono::{DateTime, Utc};

#[derive(Debug)]
pub struct RecordStore<C> {
    citizens: Vec<CitizenRecord<C>>,
    policies: Vec<PolicyRecord<C>>,
}

impl<C> Default for RecordStore<C> {
    fn default() -> Self {
        Self {
            citizens: Vec::new(),
            policies: Vec::new(),
        }
    }
}

fn slot(id: u64, len: usize) -> Option<usize> {
    let idx = usize::try_from(id.checked_sub(1)?).ok()?;
    (idx < len).then_some(idx)
}

impl<C: Clone> RecordStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn citizen_count(&self) -> u64 {
        self.citizens.len() as u64
    }

    pub fn policy_count(&self) -> u64 {
        self.policies.len() as u64
    }

    pub fn register_citizen(&mut self, inputs: CitizenInputs<C>, now: DateTime<Utc>) -> u64 {
        let id = self.citizen_count() + 1;
        self.citizens.push(CitizenRecord {
            id,
            inputs,
            created_at: now,
            cleartext: None,
        });
        id
    }

    /// `zero` must be the provider's encryption of zero; it seeds the effect index.
    pub fn register_policy(&mut self, inputs: PolicyInputs<C>, zero: C, now: DateTime<Utc>) -> u64 {
        let id = self.policy_count() + 1;
        self.policies.push(PolicyRecord {
            id,
            inputs,
            effect_index: zero,
            created_at: now,
            simulated_at: None,
            simulated_over: 0,
            cleartext: None,
        });
        id
    }

    pub fn citizen(&self, id: u64) -> Result<&CitizenRecord<C>, LedgerError> {
        slot(id, self.citizens.len())
            .map(|i| &self.citizens[i])
            .ok_or(LedgerError::NotFound { kind: TargetKind::Citizen, id })
    }

    pub fn policy(&self, id: u64) -> Result<&PolicyRecord<C>, LedgerError> {
        slot(id, self.policies.len())
            .map(|i| &self.policies[i])
            .ok_or(LedgerError::NotFound { kind: TargetKind::Policy, id })
    }

    fn citizen_mut(&mut self, id: u64) -> Result<&mut CitizenRecord<C>, LedgerError> {
        let i = slot(id, self.citizens.len())
            .ok_or(LedgerError::NotFound { kind: TargetKind::Citizen, id })?;
        Ok(&mut self.citizens[i])
    }

    fn policy_mut(&mut self, id: u64) -> Result<&mut PolicyRecord<C>, LedgerError> {
        let i = slot(id, self.policies.len())
            .ok_or(LedgerError::NotFound { kind: TargetKind::Policy, id })?;
        Ok(&mut self.policies[i])
    }

    pub fn is_revealed(&self, kind: TargetKind, id: u64) -> Result<bool, LedgerError> {
        match kind {
            TargetKind::Citizen => self.citizen(id).map(|r| r.is_revealed()),
            TargetKind::Policy => self.policy(id).map(|r| r.is_revealed()),
        }
    }

    pub fn reveal_fields(&self, kind: TargetKind, id: u64) -> Result<[C; REVEAL_ARITY], LedgerError> {
        match kind {
            TargetKind::Citizen => self.citizen(id).map(|r| r.reveal_fields()),
            TargetKind::Policy => self.policy(id).map(|r| r.reveal_fields()),
        }
    }

    /// Health and education of every citizen, in id order.
    pub fn citizen_factors(&self) -> Vec<CitizenFactors<C>> {
        self.citizens
            .iter()
            .map(|c| CitizenFactors {
                health: c.inputs.health.clone(),
                education: c.inputs.education.clone(),
            })
            .collect()
    }

    /// Store an effect index computed over the first `citizens` citizens.
    ///
    /// Ids are append-only, so a smaller population is an older snapshot and must not
    /// replace a result computed over a larger one.
    pub fn set_effect_index(
        &mut self,
        id: u64,
        effect: C,
        citizens: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let policy = self.policy_mut(id)?;
        if policy.is_revealed() {
            return Err(LedgerError::AlreadyRevealed { kind: TargetKind::Policy, id });
        }
        if citizens < policy.simulated_over {
            return Err(LedgerError::SimulationSuperseded {
                policy_id: id,
                citizens,
                newer: policy.simulated_over,
            });
        }
        policy.effect_index = effect;
        policy.simulated_at = Some(now);
        policy.simulated_over = citizens;
        Ok(())
    }

    /// Write verified cleartexts. A revealed record never changes again.
    pub fn write_cleartext(
        &mut self,
        kind: TargetKind,
        id: u64,
        values: [u64; REVEAL_ARITY],
    ) -> Result<(), LedgerError> {
        match kind {
            TargetKind::Citizen => {
                let record = self.citizen_mut(id)?;
                if record.is_revealed() {
                    return Err(LedgerError::AlreadyRevealed { kind, id });
                }
                record.cleartext = Some(values.into());
            }
            TargetKind::Policy => {
                let record = self.policy_mut(id)?;
                if record.is_revealed() {
                    return Err(LedgerError::AlreadyRevealed { kind, id });
                }
                record.cleartext = Some(values.into());
            }
        }
        Ok(())
    }
}
