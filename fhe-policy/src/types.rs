//! Record types held by the store and the cleartext views handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::REVEAL_ARITY;

/// Which table a reveal targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Citizen,
    Policy,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Citizen => f.write_str("citizen"),
            TargetKind::Policy => f.write_str("policy"),
        }
    }
}

/// Encrypted attributes contributed by one anonymous participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CitizenInputs<C> {
    pub income: C,
    pub health: C,
    pub education: C,
    pub satisfaction: C,
}

/// Encrypted parameters supplied by a policy proposer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyInputs<C> {
    pub tax_rate: C,
    pub healthcare_funding: C,
    pub education_investment: C,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenCleartext {
    pub income: u64,
    pub health: u64,
    pub education: u64,
    pub satisfaction: u64,
}

impl From<[u64; REVEAL_ARITY]> for CitizenCleartext {
    fn from([income, health, education, satisfaction]: [u64; REVEAL_ARITY]) -> Self {
        Self {
            income,
            health,
            education,
            satisfaction,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCleartext {
    pub tax_rate: u64,
    pub healthcare_funding: u64,
    pub education_investment: u64,
    pub effect_index: u64,
}

impl From<[u64; REVEAL_ARITY]> for PolicyCleartext {
    fn from(
        [tax_rate, healthcare_funding, education_investment, effect_index]: [u64; REVEAL_ARITY],
    ) -> Self {
        Self {
            tax_rate,
            healthcare_funding,
            education_investment,
            effect_index,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CitizenRecord<C> {
    pub id: u64,
    pub inputs: CitizenInputs<C>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, by a verified oracle callback.
    pub cleartext: Option<CitizenCleartext>,
}

impl<C: Clone> CitizenRecord<C> {
    pub fn is_revealed(&self) -> bool {
        self.cleartext.is_some()
    }

    /// Ciphertexts in reveal order: income, health, education, satisfaction.
    pub fn reveal_fields(&self) -> [C; REVEAL_ARITY] {
        [
            self.inputs.income.clone(),
            self.inputs.health.clone(),
            self.inputs.education.clone(),
            self.inputs.satisfaction.clone(),
        ]
    }

    pub fn view(&self) -> CitizenView {
        CitizenView {
            id: self.id,
            created_at: self.created_at,
            revealed: self.is_revealed(),
            fields: self.cleartext.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PolicyRecord<C> {
    pub id: u64,
    pub inputs: PolicyInputs<C>,
    /// Encrypted zero until the first simulation; replaced by every later run.
    pub effect_index: C,
    pub created_at: DateTime<Utc>,
    pub simulated_at: Option<DateTime<Utc>>,
    /// Citizen count the stored effect index was computed over.
    pub simulated_over: u64,
    pub cleartext: Option<PolicyCleartext>,
}

impl<C: Clone> PolicyRecord<C> {
    pub fn is_revealed(&self) -> bool {
        self.cleartext.is_some()
    }

    /// Ciphertexts in reveal order: tax rate, healthcare, education, effect index.
    pub fn reveal_fields(&self) -> [C; REVEAL_ARITY] {
        [
            self.inputs.tax_rate.clone(),
            self.inputs.healthcare_funding.clone(),
            self.inputs.education_investment.clone(),
            self.effect_index.clone(),
        ]
    }

    pub fn view(&self) -> PolicyView {
        PolicyView {
            id: self.id,
            created_at: self.created_at,
            simulated_at: self.simulated_at,
            revealed: self.is_revealed(),
            fields: self.cleartext.unwrap_or_default(),
        }
    }
}

/// Query result for a citizen. Fields are zero until revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenView {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub revealed: bool,
    #[serde(flatten)]
    pub fields: CitizenCleartext,
}

/// Query result for a policy. Fields are zero until revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub simulated_at: Option<DateTime<Utc>>,
    pub revealed: bool,
    #[serde(flatten)]
    pub fields: PolicyCleartext,
}
