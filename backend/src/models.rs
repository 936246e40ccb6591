use chrono::{DateTime, Utc};
use fhe_policy::events::LedgerEvent;
use fhe_policy::types::TargetKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptRequest {
    pub value: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub ciphertext_b64: String,
}

/// Encrypted citizen attributes, each a base64 ciphertext.
#[derive(Debug, Serialize, Deserialize)]
pub struct CitizenSubmitRequest {
    pub income: String,
    pub health: String,
    pub education: String,
    pub satisfaction: String,
}

/// Encrypted policy parameters, each a base64 ciphertext.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicySubmitRequest {
    pub tax_rate: String,
    pub healthcare_funding: String,
    pub education_investment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub policy_id: u64,
    /// Number of citizens included in this run.
    pub citizens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealRequest {
    pub kind: TargetKind,
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealResponse {
    pub request_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleCallbackRequest {
    pub request_id: Uuid,
    pub cleartexts: Vec<u64>,
    pub proof_hex: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleCallbackResponse {
    pub kind: TargetKind,
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub citizen_count: u64,
    pub policy_count: u64,
    pub pending_reveals: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
    pub events: Vec<EventItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventItem {
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
