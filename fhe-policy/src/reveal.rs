//! Bookkeeping for the two-phase reveal protocol.
//!
//! Phase 1 records `request_id -> target` once the oracle accepted a batch. Phase 2
//! consumes the entry exactly once, after the callback's proof has been checked. A target
//! has at most one outstanding request.

use crate::error::LedgerError;
use crate::provider::RequestId;
use crate::types::TargetKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReveal {
    pub request_id: RequestId,
    pub kind: TargetKind,
    pub id: u64,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RevealBook {
    by_request: HashMap<RequestId, PendingReveal>,
    by_target: HashMap<(TargetKind, u64), RequestId>,
}

impl RevealBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_request.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_request.is_empty()
    }

    pub fn pending_for(&self, kind: TargetKind, id: u64) -> Option<RequestId> {
        self.by_target.get(&(kind, id)).copied()
    }

    /// Fails with `RevealPending` if the target already has an outstanding request.
    pub fn ensure_idle(&self, kind: TargetKind, id: u64) -> Result<(), LedgerError> {
        match self.pending_for(kind, id) {
            Some(_) => Err(LedgerError::RevealPending { kind, id }),
            None => Ok(()),
        }
    }

    pub fn insert(&mut self, pending: PendingReveal) {
        self.by_target.insert((pending.kind, pending.id), pending.request_id);
        self.by_request.insert(pending.request_id, pending);
    }

    pub fn get(&self, request_id: RequestId) -> Result<&PendingReveal, LedgerError> {
        self.by_request
            .get(&request_id)
            .ok_or(LedgerError::UnknownRequest(request_id))
    }

    pub fn remove(&mut self, request_id: RequestId) -> Option<PendingReveal> {
        let pending = self.by_request.remove(&request_id)?;
        self.by_target.remove(&(pending.kind, pending.id));
        Some(pending)
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<PendingReveal> {
        let mut out: Vec<_> = self.by_request.values().cloned().collect();
        out.sort_by_key(|p| p.requested_at);
        out
    }

    /// Drop every request with `requested_at + ttl <= now`.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<PendingReveal> {
        let stale: Vec<RequestId> = self
            .by_request
            .values()
            .filter(|p| p.requested_at + ttl <= now)
            .map(|p| p.request_id)
            .collect();

        let mut out: Vec<_> = stale.into_iter().filter_map(|r| self.remove(r)).collect();
        out.sort_by_key(|p| p.requested_at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(kind: TargetKind, id: u64, at: DateTime<Utc>) -> PendingReveal {
        PendingReveal { request_id: RequestId::new_v4(), kind, id, requested_at: at }
    }

    #[test]
    fn one_request_per_target() {
        let mut book = RevealBook::new();
        let p = pending(TargetKind::Citizen, 1, Utc::now());
        let request_id = p.request_id;
        book.insert(p);

        assert!(matches!(
            book.ensure_idle(TargetKind::Citizen, 1),
            Err(LedgerError::RevealPending { .. })
        ));
        assert!(book.ensure_idle(TargetKind::Policy, 1).is_ok());

        book.remove(request_id).unwrap();
        assert!(book.ensure_idle(TargetKind::Citizen, 1).is_ok());
        assert!(matches!(book.get(request_id), Err(LedgerError::UnknownRequest(_))));
        assert!(book.remove(request_id).is_none());
    }

    #[test]
    fn expire_removes_only_stale_entries() {
        let mut book = RevealBook::new();
        let now = Utc::now();
        let old = pending(TargetKind::Citizen, 1, now - Duration::seconds(120));
        let fresh = pending(TargetKind::Policy, 1, now - Duration::seconds(5));
        let fresh_id = fresh.request_id;
        book.insert(old.clone());
        book.insert(fresh);

        let expired = book.expire(now, Duration::seconds(60));
        assert_eq!(expired, vec![old]);
        assert_eq!(book.len(), 1);
        assert!(book.get(fresh_id).is_ok());
        assert!(book.pending_for(TargetKind::Citizen, 1).is_none());
    }
}
