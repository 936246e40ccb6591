use crate::config::Config;
use crate::db::Db;
use crate::events::ChannelSink;
use fhe_policy::clear::ClearProvider;
use fhe_policy::events::LedgerEvent;
use fhe_policy::{LedgerConfig, PolicyLedger};
use rand::rngs::OsRng;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub type Ledger = PolicyLedger<ClearProvider, ChannelSink>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub ledger: Arc<Ledger>,
    pub api_key: Arc<str>,
}

impl AppState {
    /// Build the ledger and its event channel. The receiver must be handed to
    /// `events::spawn_event_writer`.
    pub fn new(db: Db, config: &Config) -> (Self, UnboundedReceiver<LedgerEvent>) {
        let provider = match config.oracle_seed {
            Some(seed) => ClearProvider::new(seed),
            None => ClearProvider::random(&mut OsRng),
        };

        let (sink, rx) = ChannelSink::new();
        let ledger = PolicyLedger::new(
            Arc::new(provider),
            sink,
            LedgerConfig {
                reveal_ttl: config.reveal_ttl,
            },
        );

        let state = Self {
            db,
            ledger: Arc::new(ledger),
            api_key: Arc::from(config.api_key.as_str()),
        };
        (state, rx)
    }

    pub fn provider(&self) -> &ClearProvider {
        self.ledger.provider()
    }
}
