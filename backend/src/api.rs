use crate::db;
use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use fhe_policy::clear::ClearCiphertext;
use fhe_policy::provider::{DecryptionProof, FheProvider, RequestId};
use fhe_policy::types::{CitizenInputs, CitizenView, PolicyInputs, PolicyView};
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, serde::Deserialize)]
pub struct ListEventsParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/policies", post(submit_policy))
        .route("/api/v1/policies/:id/simulate", post(simulate_policy))
        .route("/api/v1/reveals", post(request_reveal))
        .route("/api/v1/oracle/callback", post(oracle_callback))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/fhe/encrypt", post(encrypt))
        .route("/api/v1/citizens", post(submit_citizen))
        .route("/api/v1/citizens/:id", get(get_citizen))
        .route("/api/v1/policies/:id", get(get_policy))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/events", get(list_events))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key.as_bytes() == state.api_key.as_bytes() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!(path = %request.uri().path(), "unauthorized access attempt");
    Err(ApiError::Unauthorized("missing or invalid API key".to_string()))
}

fn decode_ciphertext(state: &AppState, field: &str, b64: &str) -> Result<ClearCiphertext, ApiError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| ApiError::BadRequest(format!("{field}: invalid base64")))?;
    state
        .provider()
        .deserialize(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

/// Dev helper: client-side encryption with the clear provider.
async fn encrypt(State(state): State<AppState>, Json(req): Json<EncryptRequest>) -> Json<EncryptResponse> {
    let provider = state.provider();
    let bytes = provider.serialize(&provider.encrypt(req.value));
    Json(EncryptResponse {
        ciphertext_b64: base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

async fn submit_citizen(
    State(state): State<AppState>,
    Json(req): Json<CitizenSubmitRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let inputs = CitizenInputs {
        income: decode_ciphertext(&state, "income", &req.income)?,
        health: decode_ciphertext(&state, "health", &req.health)?,
        education: decode_ciphertext(&state, "education", &req.education)?,
        satisfaction: decode_ciphertext(&state, "satisfaction", &req.satisfaction)?,
    };

    let id = state.ledger.register_citizen(inputs);
    Ok(Json(CreatedResponse { id }))
}

async fn submit_policy(
    State(state): State<AppState>,
    Json(req): Json<PolicySubmitRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let inputs = PolicyInputs {
        tax_rate: decode_ciphertext(&state, "tax_rate", &req.tax_rate)?,
        healthcare_funding: decode_ciphertext(&state, "healthcare_funding", &req.healthcare_funding)?,
        education_investment: decode_ciphertext(&state, "education_investment", &req.education_investment)?,
    };

    let id = state.ledger.register_policy(inputs);
    Ok(Json(CreatedResponse { id }))
}

async fn get_citizen(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<CitizenView>, ApiError> {
    Ok(Json(state.ledger.citizen(id)?))
}

async fn get_policy(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<PolicyView>, ApiError> {
    Ok(Json(state.ledger.policy(id)?))
}

async fn simulate_policy(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SimulateResponse>, ApiError> {
    // Cost is linear in the citizen count; keep it off the async workers.
    let ledger = state.ledger.clone();
    let citizens = tokio::task::spawn_blocking(move || ledger.simulate_policy_effect(id))
        .await
        .map_err(|_| ApiError::Internal)??;

    Ok(Json(SimulateResponse { policy_id: id, citizens }))
}

async fn request_reveal(
    State(state): State<AppState>,
    Json(req): Json<RevealRequest>,
) -> Result<Json<RevealResponse>, ApiError> {
    let request_id = state.ledger.request_reveal(req.kind, req.id)?;
    Ok(Json(RevealResponse { request_id: request_id.0 }))
}

async fn oracle_callback(
    State(state): State<AppState>,
    Json(req): Json<OracleCallbackRequest>,
) -> Result<Json<OracleCallbackResponse>, ApiError> {
    let proof = DecryptionProof::from_hex(&req.proof_hex)
        .map_err(|_| ApiError::BadRequest("invalid proof_hex".to_string()))?;

    let (kind, id) = state
        .ledger
        .finalize_reveal(RequestId(req.request_id), &req.cleartexts, &proof)?;

    Ok(Json(OracleCallbackResponse { kind, id }))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        citizen_count: state.ledger.citizen_count(),
        policy_count: state.ledger.policy_count(),
        pending_reveals: state.ledger.pending_reveals().len(),
    })
}

async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<EventListResponse>, ApiError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(50).min(500);

    let total = db::count_events(&state.db).await?;
    let rows = db::list_events(&state.db, offset, limit).await?;

    let events = rows
        .into_iter()
        .map(|(seq, created_at, event)| EventItem { seq, created_at, event })
        .collect();

    Ok(Json(EventListResponse {
        offset,
        limit,
        total,
        events,
    }))
}
