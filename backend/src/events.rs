//! Forwards ledger events to SQLite through a channel.
//!
//! The ledger emits synchronously under its lock; the writer task drains the channel in
//! order, so the table's `seq` matches the ledger's operation order.

use crate::db::{self, Db};
use fhe_policy::events::{EventSink, LedgerEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::warn;

pub struct ChannelSink {
    tx: UnboundedSender<LedgerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<LedgerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LedgerEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(event = e.0.name(), "event writer gone; dropping event");
        }
    }
}

pub fn spawn_event_writer(db: Db, mut rx: UnboundedReceiver<LedgerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = db::insert_event(&db, &event).await {
                warn!(event = event.name(), error = %e, "failed to persist event");
            }
        }
    })
}
