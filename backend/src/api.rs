use crate::db;
use crate::errors::ApiError;
use crate::models::*;
use crate::prover;
use crate::state::AppState;
use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use zk_aggregate::config::parse_address;
use zk_aggregate::constants::DEFAULT_CAPACITY;
use zk_aggregate::groth16::{deserialize_proof, deserialize_vk, serialize_vk, verify_proof};
use zk_aggregate::types::FrHex;

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/proofs/volatility", post(create_volatility_proof))
        .route("/api/v1/proofs/activity", post(create_activity_proof))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/zk/vk/:circuit", get(get_vk))
        .route("/api/v1/proofs/:id", get(get_proof))
        .route("/api/v1/verify", post(verify))
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
) -> Result<Response, StatusCode> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == state.settings.api_key.as_str() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("unauthorized access attempt");
    Err(StatusCode::UNAUTHORIZED)
}

fn parse_circuit(s: &str) -> Result<CircuitKind, ApiError> {
    CircuitKind::parse(s).ok_or_else(|| ApiError::NotFound(format!("unknown circuit '{s}'")))
}

async fn create_volatility_proof(
    State(state): State<AppState>,
    Json(req): Json<ProveVolatilityRequest>,
) -> Result<Json<ProofResponse>, ApiError> {
    Ok(Json(prover::prove_volatility_job(&state, req.records).await?))
}

async fn create_activity_proof(
    State(state): State<AppState>,
    Json(req): Json<ProveActivityRequest>,
) -> Result<Json<ProofResponse>, ApiError> {
    let user = parse_address("user", &req.user).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(prover::prove_activity_job(&state, user, req.records).await?))
}

async fn get_proof(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProofRecord>, ApiError> {
    db::get_proof(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("proof not found".to_string()))
}

async fn get_vk(State(state): State<AppState>, Path(circuit): Path<String>) -> Result<Json<ZkVkResponse>, ApiError> {
    let circuit = parse_circuit(&circuit)?;
    let keys = state.ensure_keys(circuit).await?;
    let vk_bytes = serialize_vk(keys.vk.as_ref())?;

    Ok(Json(ZkVkResponse {
        circuit,
        curve: "bn254".to_string(),
        proof_system: "groth16".to_string(),
        capacity: DEFAULT_CAPACITY,
        output_bits: circuit.output_bits().to_vec(),
        vk_b64: base64::engine::general_purpose::STANDARD.encode(vk_bytes),
    }))
}

async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> Result<Json<VerifyResponse>, ApiError> {
    let b64 = base64::engine::general_purpose::STANDARD;

    let outputs = req.tagged_outputs()?;

    let vk = match &req.vk_b64 {
        Some(vk_b64) => {
            let vk_bytes = b64.decode(vk_b64).map_err(|_| ApiError::BadRequest("invalid vk_b64".to_string()))?;
            deserialize_vk(&vk_bytes).map_err(|_| ApiError::BadRequest("invalid vk".to_string()))?
        }
        None => state.ensure_keys(req.circuit).await?.vk.as_ref().clone(),
    };

    let proof_bytes = b64.decode(&req.proof_b64).map_err(|_| ApiError::BadRequest("invalid proof_b64".to_string()))?;
    let proof = deserialize_proof(&proof_bytes).map_err(|_| ApiError::BadRequest("invalid proof".to_string()))?;

    let commitment = FrHex { hex: req.commitment_hex.clone() }
        .to_fr()
        .map_err(ApiError::BadRequest)?;

    let ok = verify_proof(&vk, &proof, commitment, &outputs).is_ok();
    tracing::debug!(circuit = req.circuit.as_str(), ok, "verify request");

    Ok(Json(VerifyResponse { ok }))
}
