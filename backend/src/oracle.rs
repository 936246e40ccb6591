//! Local decryption oracle worker.
//!
//! Stands in for the external oracle: drains the clear provider's job queue, decrypts,
//! signs, and delivers each callback through the same `finalize_reveal` entry point an
//! external oracle would reach via `POST /api/v1/oracle/callback`.

use crate::state::AppState;
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

/// Process everything currently queued, then expire stale requests.
///
/// Returns the number of reveals finalized.
pub fn process_pending(state: &AppState) -> usize {
    let provider = state.provider();
    let mut finalized = 0;

    for job in provider.drain_jobs() {
        let cb = match provider.fulfil(&job) {
            Ok(cb) => cb,
            Err(e) => {
                warn!(request_id = %job.request_id, error = %e, "local oracle could not sign job");
                continue;
            }
        };
        match state.ledger.finalize_reveal(cb.request_id, &cb.cleartexts, &cb.proof) {
            Ok((kind, id)) => {
                finalized += 1;
                info!(%kind, id, request_id = %cb.request_id, "local oracle delivered callback");
            }
            Err(e) => warn!(request_id = %cb.request_id, error = %e, "local oracle callback rejected"),
        }
    }

    let expired = state.ledger.expire_stale_reveals(Utc::now());
    if !expired.is_empty() {
        info!(count = expired.len(), "expired pending reveals");
    }

    finalized
}

/// Background job: poll the queue forever.
pub async fn run_local_oracle(state: AppState, poll: Duration) {
    let mut ticker = tokio::time::interval(poll);
    loop {
        ticker.tick().await;

        let st = state.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || process_pending(&st)).await {
            warn!(error = %e, "local oracle pass panicked");
        }
    }
}
