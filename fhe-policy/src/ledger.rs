//! The sequentially-consistent state machine.
//!
//! Every public operation is applied atomically under one lock, and events are emitted
//! before the lock is released. The one exception is the homomorphic work inside
//! `simulate_policy_effect`, which runs on a snapshot with the lock released so that
//! registrations are not blocked by a long simulation.

use crate::aggregation;
use crate::constants::REVEAL_ARITY;
use crate::error::LedgerError;
use crate::events::{EventSink, LedgerEvent};
use crate::provider::{DecryptionOracle, DecryptionProof, FheProvider, RequestId};
use crate::reveal::{PendingReveal, RevealBook};
use crate::store::RecordStore;
use crate::types::{CitizenInputs, CitizenView, PolicyInputs, PolicyView, TargetKind};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
pub struct LedgerConfig {
    /// Pending reveals older than this are dropped by `expire_stale_reveals`.
    /// `None` keeps them forever.
    pub reveal_ttl: Option<Duration>,
}

struct LedgerState<C> {
    store: RecordStore<C>,
    reveals: RevealBook,
}

pub struct PolicyLedger<P: FheProvider, S> {
    state: Mutex<LedgerState<P::Ciphertext>>,
    provider: Arc<P>,
    sink: S,
    config: LedgerConfig,
}

impl<P, S> PolicyLedger<P, S>
where
    P: FheProvider + DecryptionOracle<<P as FheProvider>::Ciphertext>,
    S: EventSink,
{
    pub fn new(provider: Arc<P>, sink: S, config: LedgerConfig) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                store: RecordStore::new(),
                reveals: RevealBook::new(),
            }),
            provider,
            sink,
            config,
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState<P::Ciphertext>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_citizen(&self, inputs: CitizenInputs<P::Ciphertext>) -> u64 {
        let mut state = self.lock();
        let id = state.store.register_citizen(inputs, Utc::now());
        self.sink.emit(LedgerEvent::CitizenRegistered { id });
        info!(citizen_id = id, "citizen registered");
        id
    }

    pub fn register_policy(&self, inputs: PolicyInputs<P::Ciphertext>) -> u64 {
        let zero = self.provider.encrypt_zero();
        let mut state = self.lock();
        let id = state.store.register_policy(inputs, zero, Utc::now());
        self.sink.emit(LedgerEvent::PolicyProposed { id });
        info!(policy_id = id, "policy proposed");
        id
    }

    pub fn citizen(&self, id: u64) -> Result<CitizenView, LedgerError> {
        self.lock().store.citizen(id).map(|r| r.view())
    }

    pub fn policy(&self, id: u64) -> Result<PolicyView, LedgerError> {
        self.lock().store.policy(id).map(|r| r.view())
    }

    /// Current encrypted effect index of a policy.
    pub fn effect_index(&self, policy_id: u64) -> Result<P::Ciphertext, LedgerError> {
        self.lock().store.policy(policy_id).map(|r| r.effect_index.clone())
    }

    pub fn citizen_count(&self) -> u64 {
        self.lock().store.citizen_count()
    }

    pub fn policy_count(&self) -> u64 {
        self.lock().store.policy_count()
    }

    /// Recompute a policy's effect index from the current citizen population.
    ///
    /// Returns the number of citizens included. Citizens registered while the computation
    /// runs are not guaranteed to be counted. A revealed policy is immutable, and a policy
    /// with a reveal in flight is left alone so the oracle decrypts what was submitted.
    /// A run that finishes after one over a larger population fails with
    /// `SimulationSuperseded` and leaves the newer result in place.
    pub fn simulate_policy_effect(&self, policy_id: u64) -> Result<usize, LedgerError> {
        let (policy, citizens) = {
            let state = self.lock();
            let record = state
                .store
                .policy(policy_id)
                .map_err(|_| LedgerError::InvalidPolicy(policy_id))?;
            Self::ensure_policy_writable(&state, policy_id, record.is_revealed())?;
            (record.inputs.clone(), state.store.citizen_factors())
        };

        info!(policy_id, citizens = citizens.len(), "simulating policy effect");
        let total = aggregation::aggregate_effect(self.provider.as_ref(), &policy, &citizens);

        let mut state = self.lock();
        let revealed = state.store.policy(policy_id)?.is_revealed();
        Self::ensure_policy_writable(&state, policy_id, revealed)?;
        state
            .store
            .set_effect_index(policy_id, total, citizens.len() as u64, Utc::now())?;
        self.sink.emit(LedgerEvent::SimulationCompleted { policy_id });
        info!(policy_id, citizens = citizens.len(), "simulation completed");

        Ok(citizens.len())
    }

    fn ensure_policy_writable(
        state: &LedgerState<P::Ciphertext>,
        policy_id: u64,
        revealed: bool,
    ) -> Result<(), LedgerError> {
        if revealed {
            return Err(LedgerError::AlreadyRevealed { kind: TargetKind::Policy, id: policy_id });
        }
        state.reveals.ensure_idle(TargetKind::Policy, policy_id)
    }

    /// Phase 1: hand the target's four ciphertexts to the oracle and remember the request.
    pub fn request_reveal(&self, kind: TargetKind, id: u64) -> Result<RequestId, LedgerError> {
        let mut state = self.lock();

        if state.store.is_revealed(kind, id)? {
            return Err(LedgerError::AlreadyRevealed { kind, id });
        }
        state.reveals.ensure_idle(kind, id)?;

        let fields = state.store.reveal_fields(kind, id)?;
        let request_id = self.provider.submit(&fields)?;

        state.reveals.insert(PendingReveal {
            request_id,
            kind,
            id,
            requested_at: Utc::now(),
        });
        self.sink.emit(LedgerEvent::DecryptionRequested { kind, id, request_id });
        info!(%kind, id, %request_id, "decryption requested");

        Ok(request_id)
    }

    /// Phase 2: accept the oracle's cleartexts if the proof checks out.
    ///
    /// On any failure the pending entry stays in place.
    pub fn finalize_reveal(
        &self,
        request_id: RequestId,
        cleartexts: &[u64],
        proof: &DecryptionProof,
    ) -> Result<(TargetKind, u64), LedgerError> {
        let mut state = self.lock();

        let (kind, id) = {
            let pending = state.reveals.get(request_id)?;
            (pending.kind, pending.id)
        };

        let values: [u64; REVEAL_ARITY] =
            cleartexts.try_into().map_err(|_| LedgerError::WrongArity {
                expected: REVEAL_ARITY,
                got: cleartexts.len(),
            })?;

        if !self.provider.verify(request_id, &values, proof) {
            warn!(%kind, id, %request_id, "decryption proof rejected");
            return Err(LedgerError::InvalidProof(request_id));
        }

        state.store.write_cleartext(kind, id, values)?;
        state.reveals.remove(request_id);
        self.sink.emit(LedgerEvent::DecryptionCompleted { kind, id, request_id });
        info!(%kind, id, %request_id, "decryption completed");

        Ok((kind, id))
    }

    pub fn pending_reveals(&self) -> Vec<PendingReveal> {
        self.lock().reveals.list()
    }

    /// Drop pending reveals older than the configured TTL. The targets may be requested
    /// again; late callbacks for dropped requests fail with `UnknownRequest`.
    pub fn expire_stale_reveals(&self, now: DateTime<Utc>) -> Vec<PendingReveal> {
        let Some(ttl) = self.config.reveal_ttl else {
            return Vec::new();
        };

        let mut state = self.lock();
        let expired = state.reveals.expire(now, ttl);
        for p in &expired {
            self.sink.emit(LedgerEvent::DecryptionExpired {
                kind: p.kind,
                id: p.id,
                request_id: p.request_id,
            });
            warn!(kind = %p.kind, id = p.id, request_id = %p.request_id, "pending reveal expired");
        }
        expired
    }
}
