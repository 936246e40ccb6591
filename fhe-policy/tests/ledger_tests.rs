//! End-to-end behaviour of the ledger against the clear provider.

use fhe_policy::clear::{ClearCiphertext, ClearProvider};
use fhe_policy::events::{LedgerEvent, RecordingSink};
use fhe_policy::provider::{DecryptionOracle, DecryptionProof, FheError, FheProvider, RequestId};
use fhe_policy::types::{CitizenInputs, PolicyInputs, TargetKind};
use fhe_policy::{LedgerConfig, LedgerError, PolicyLedger};
use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::num::NonZeroU64;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

type Ledger = PolicyLedger<ClearProvider, Arc<RecordingSink>>;

fn setup() -> (Ledger, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let provider = Arc::new(ClearProvider::new([42u8; 32]));
    (PolicyLedger::new(provider, sink.clone(), LedgerConfig::default()), sink)
}

fn citizen_inputs(p: &ClearProvider, income: u64, health: u64, education: u64, satisfaction: u64) -> CitizenInputs<ClearCiphertext> {
    CitizenInputs {
        income: p.encrypt(income),
        health: p.encrypt(health),
        education: p.encrypt(education),
        satisfaction: p.encrypt(satisfaction),
    }
}

fn policy_inputs(p: &ClearProvider, tax: u64, healthcare: u64, education: u64) -> PolicyInputs<ClearCiphertext> {
    PolicyInputs {
        tax_rate: p.encrypt(tax),
        healthcare_funding: p.encrypt(healthcare),
        education_investment: p.encrypt(education),
    }
}

/// Run the local oracle once and feed every callback back into the ledger.
fn run_oracle(ledger: &Ledger) {
    let provider = ledger.provider().clone();
    for job in provider.drain_jobs() {
        let cb = provider.fulfil(&job).unwrap();
        ledger.finalize_reveal(cb.request_id, &cb.cleartexts, &cb.proof).unwrap();
    }
}

#[test]
fn end_to_end_simulation_and_reveal() {
    let (ledger, sink) = setup();
    let p = ledger.provider().clone();

    let c1 = ledger.register_citizen(citizen_inputs(&p, 52_000, 80, 90, 7));
    let c2 = ledger.register_citizen(citizen_inputs(&p, 38_000, 60, 70, 5));
    let policy = ledger.register_policy(policy_inputs(&p, 1000, 50, 50));
    assert_eq!((c1, c2, policy), (1, 2, 1));

    assert_eq!(ledger.simulate_policy_effect(policy).unwrap(), 2);
    let expected = (50 * 80 + 50 * 90 + 9000) / 100 + (50 * 60 + 50 * 70 + 9000) / 100;
    assert_eq!(expected, 330);
    assert_eq!(ledger.effect_index(policy).unwrap(), p.encrypt(expected));

    ledger.request_reveal(TargetKind::Policy, policy).unwrap();
    ledger.request_reveal(TargetKind::Citizen, c1).unwrap();
    run_oracle(&ledger);

    let view = ledger.policy(policy).unwrap();
    assert!(view.revealed);
    assert_eq!(view.fields.tax_rate, 1000);
    assert_eq!(view.fields.healthcare_funding, 50);
    assert_eq!(view.fields.education_investment, 50);
    assert_eq!(view.fields.effect_index, 330);

    let citizen = ledger.citizen(c1).unwrap();
    assert!(citizen.revealed);
    assert_eq!(citizen.fields.income, 52_000);
    assert_eq!(citizen.fields.satisfaction, 7);

    let other = ledger.citizen(c2).unwrap();
    assert!(!other.revealed);
    assert_eq!(other.fields.income, 0);

    let names: Vec<_> = sink.events().iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "citizen_registered",
            "citizen_registered",
            "policy_proposed",
            "simulation_completed",
            "decryption_requested",
            "decryption_requested",
            "decryption_completed",
            "decryption_completed",
        ]
    );
    assert!(ledger.pending_reveals().is_empty());
}

#[test]
fn simulation_recomputes_after_new_citizen() {
    let (ledger, _) = setup();
    let p = ledger.provider().clone();

    ledger.register_citizen(citizen_inputs(&p, 0, 80, 90, 0));
    let policy = ledger.register_policy(policy_inputs(&p, 1000, 50, 50));

    ledger.simulate_policy_effect(policy).unwrap();
    let first = ledger.effect_index(policy).unwrap();
    ledger.simulate_policy_effect(policy).unwrap();
    assert_eq!(ledger.effect_index(policy).unwrap(), first);

    ledger.register_citizen(citizen_inputs(&p, 0, 60, 70, 0));
    ledger.simulate_policy_effect(policy).unwrap();
    let contribution = p.encrypt((50 * 60 + 50 * 70 + 9000) / 100);
    assert_eq!(ledger.effect_index(policy).unwrap(), p.add(&first, &contribution));
}

#[test]
fn second_finalize_with_same_request_is_unknown() {
    let (ledger, _) = setup();
    let p = ledger.provider().clone();
    let id = ledger.register_citizen(citizen_inputs(&p, 1, 2, 3, 4));

    let request_id = ledger.request_reveal(TargetKind::Citizen, id).unwrap();
    let cb = p.fulfil(&p.drain_jobs()[0]).unwrap();

    assert_eq!(
        ledger.finalize_reveal(request_id, &cb.cleartexts, &cb.proof).unwrap(),
        (TargetKind::Citizen, id)
    );
    assert!(matches!(
        ledger.finalize_reveal(request_id, &cb.cleartexts, &cb.proof),
        Err(LedgerError::UnknownRequest(r)) if r == request_id
    ));
}

#[test]
fn tampered_callback_is_rejected_without_side_effects() {
    let (ledger, sink) = setup();
    let p = ledger.provider().clone();
    let id = ledger.register_citizen(citizen_inputs(&p, 1, 2, 3, 4));

    let request_id = ledger.request_reveal(TargetKind::Citizen, id).unwrap();
    let cb = p.fulfil(&p.drain_jobs()[0]).unwrap();
    let events_before = sink.len();

    let err = ledger.finalize_reveal(request_id, &[1, 2, 3, 5], &cb.proof).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidProof(_)));

    let err = ledger
        .finalize_reveal(request_id, &cb.cleartexts, &DecryptionProof(vec![0u8; 32]))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidProof(_)));

    let view = ledger.citizen(id).unwrap();
    assert!(!view.revealed);
    assert_eq!(view.fields, Default::default());
    assert_eq!(sink.len(), events_before);

    // The request stays pending, so a correct callback still lands.
    ledger.finalize_reveal(request_id, &cb.cleartexts, &cb.proof).unwrap();
    assert!(ledger.citizen(id).unwrap().revealed);
}

#[test]
fn reveal_of_revealed_record_fails_and_emits_nothing() {
    let (ledger, sink) = setup();
    let p = ledger.provider().clone();
    let id = ledger.register_policy(policy_inputs(&p, 1, 2, 3));

    ledger.request_reveal(TargetKind::Policy, id).unwrap();
    run_oracle(&ledger);
    let events_before = sink.len();

    assert!(matches!(
        ledger.request_reveal(TargetKind::Policy, id),
        Err(LedgerError::AlreadyRevealed { kind: TargetKind::Policy, id: 1 })
    ));
    assert!(matches!(
        ledger.simulate_policy_effect(id),
        Err(LedgerError::AlreadyRevealed { .. })
    ));
    assert_eq!(sink.len(), events_before);
    assert_eq!(p.queued_jobs(), 0);
}

#[test]
fn reveal_of_missing_record_is_not_found() {
    let (ledger, _) = setup();
    assert!(matches!(
        ledger.request_reveal(TargetKind::Citizen, 0),
        Err(LedgerError::NotFound { .. })
    ));
    assert!(matches!(
        ledger.request_reveal(TargetKind::Policy, 1),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn concurrent_registrations_get_distinct_dense_ids() {
    let (ledger, sink) = setup();
    let ledger = Arc::new(ledger);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                let p = ledger.provider().clone();
                (0..25)
                    .map(|i| ledger.register_citizen(citizen_inputs(&p, t * 100 + i, 1, 1, 1)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=200).collect::<Vec<_>>());
    assert_eq!(ledger.citizen_count(), 200);

    let emitted: Vec<u64> = sink
        .events()
        .iter()
        .map(|e| match e {
            LedgerEvent::CitizenRegistered { id } => *id,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(emitted, (1..=200).collect::<Vec<_>>());
}

#[test]
fn synthetic_population_matches_plain_arithmetic() {
    let (ledger, _) = setup();
    let p = ledger.provider().clone();
    let mut rng = ChaCha20Rng::from_seed([9u8; 32]);

    let mut expected = 0u64;
    for _ in 0..500 {
        let health = (rng.next_u32() % 101) as u64;
        let education = (rng.next_u32() % 101) as u64;
        ledger.register_citizen(citizen_inputs(&p, rng.next_u32() as u64, health, education, 0));
        expected += (25 * health + 40 * education + (10_000 - 1500)) / 100;
    }

    let policy = ledger.register_policy(policy_inputs(&p, 1500, 25, 40));
    assert_eq!(ledger.simulate_policy_effect(policy).unwrap(), 500);
    assert_eq!(ledger.effect_index(policy).unwrap(), p.encrypt(expected));
}

/// Clear provider whose first `div` reports in and then waits to be released.
struct GatedProvider {
    inner: ClearProvider,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl FheProvider for GatedProvider {
    type Ciphertext = ClearCiphertext;

    fn encrypt_const(&self, value: u64) -> ClearCiphertext {
        self.inner.encrypt_const(value)
    }

    fn add(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        self.inner.add(a, b)
    }

    fn sub(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        self.inner.sub(a, b)
    }

    fn mul(&self, a: &ClearCiphertext, b: &ClearCiphertext) -> ClearCiphertext {
        self.inner.mul(a, b)
    }

    fn div(&self, a: &ClearCiphertext, divisor: NonZeroU64) -> ClearCiphertext {
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }
        self.inner.div(a, divisor)
    }

    fn serialize(&self, ct: &ClearCiphertext) -> Vec<u8> {
        self.inner.serialize(ct)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ClearCiphertext, FheError> {
        self.inner.deserialize(bytes)
    }
}

impl DecryptionOracle<ClearCiphertext> for GatedProvider {
    fn submit(&self, ciphertexts: &[ClearCiphertext]) -> Result<RequestId, FheError> {
        self.inner.submit(ciphertexts)
    }

    fn verify(&self, request_id: RequestId, cleartexts: &[u64], proof: &DecryptionProof) -> bool {
        self.inner.verify(request_id, cleartexts, proof)
    }
}

#[test]
fn slow_simulation_cannot_overwrite_a_newer_one() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let provider = Arc::new(GatedProvider {
        inner: ClearProvider::new([42u8; 32]),
        gate: Mutex::new(Some((entered_tx, release_rx))),
    });
    let sink = Arc::new(RecordingSink::new());
    let ledger = Arc::new(PolicyLedger::new(provider.clone(), sink.clone(), LedgerConfig::default()));
    let p = &provider.inner;

    ledger.register_citizen(citizen_inputs(p, 0, 80, 90, 0));
    let policy = ledger.register_policy(policy_inputs(p, 1000, 50, 50));

    // The slow run snapshots one citizen and parks inside the provider.
    let slow = {
        let ledger = ledger.clone();
        std::thread::spawn(move || ledger.simulate_policy_effect(policy))
    };
    entered_rx.recv().unwrap();

    ledger.register_citizen(citizen_inputs(p, 0, 60, 70, 0));
    assert_eq!(ledger.simulate_policy_effect(policy).unwrap(), 2);
    assert_eq!(ledger.effect_index(policy).unwrap(), p.encrypt(330));

    release_tx.send(()).unwrap();
    let err = slow.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        LedgerError::SimulationSuperseded { citizens: 1, newer: 2, .. }
    ));

    assert_eq!(ledger.effect_index(policy).unwrap(), p.encrypt(330));
    let completed = sink
        .events()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::SimulationCompleted { .. }))
        .count();
    assert_eq!(completed, 1);
}

#[derive(Debug, Clone)]
enum Op {
    Citizen,
    Policy,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Citizen), Just(Op::Policy)]
}

proptest! {
    /// Ids are dense from 1, per table, for any interleaving of registrations.
    #[test]
    fn ids_are_dense_and_independent(ops in prop::collection::vec(op(), 0..40)) {
        let (ledger, _) = setup();
        let p = ledger.provider().clone();
        let (mut citizens, mut policies) = (0u64, 0u64);

        for op in ops {
            match op {
                Op::Citizen => {
                    citizens += 1;
                    prop_assert_eq!(ledger.register_citizen(citizen_inputs(&p, 1, 1, 1, 1)), citizens);
                }
                Op::Policy => {
                    policies += 1;
                    prop_assert_eq!(ledger.register_policy(policy_inputs(&p, 1, 1, 1)), policies);
                }
            }
        }

        prop_assert_eq!(ledger.citizen_count(), citizens);
        prop_assert_eq!(ledger.policy_count(), policies);
        prop_assert!(
            matches!(ledger.citizen(0), Err(LedgerError::NotFound { .. })),
            "citizen 0 should not exist"
        );
        prop_assert!(
            matches!(ledger.policy(0), Err(LedgerError::NotFound { .. })),
            "policy 0 should not exist"
        );
        prop_assert!(
            matches!(ledger.citizen(citizens + 1), Err(LedgerError::NotFound { .. })),
            "citizen beyond counter should not exist"
        );
        prop_assert!(
            matches!(ledger.policy(policies + 1), Err(LedgerError::NotFound { .. })),
            "policy beyond counter should not exist"
        );
    }

    /// Re-running a simulation on an unchanged population is a no-op on the result.
    #[test]
    fn simulation_is_deterministic(
        population in prop::collection::vec((0u64..=100, 0u64..=100), 0..20),
        tax in 0u64..=10_000,
        healthcare in 0u64..1_000,
        education in 0u64..1_000,
    ) {
        let (ledger, _) = setup();
        let p = ledger.provider().clone();
        for (h, e) in &population {
            ledger.register_citizen(citizen_inputs(&p, 0, *h, *e, 0));
        }
        let policy = ledger.register_policy(policy_inputs(&p, tax, healthcare, education));

        ledger.simulate_policy_effect(policy).unwrap();
        let first = ledger.effect_index(policy).unwrap();
        ledger.simulate_policy_effect(policy).unwrap();
        prop_assert_eq!(ledger.effect_index(policy).unwrap(), first.clone());

        let expected: u64 = population
            .iter()
            .map(|(h, e)| (healthcare * h + education * e + (10_000 - tax)) / 100)
            .sum();
        prop_assert_eq!(first, p.encrypt(expected));
    }
}
