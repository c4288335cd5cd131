use crate::db;
use crate::errors::ApiError;
use crate::models::{CircuitKind, ProofRecord, ProofResponse};
use crate::state::AppState;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Proof, VerifyingKey};
use base64::Engine;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use zk_aggregate::constants::DEFAULT_CAPACITY;
use zk_aggregate::groth16::{prove_activity, prove_volatility, serialize_proof, verify_proof};
use zk_aggregate::stream::DataStream;
use zk_aggregate::types::{FrHex, OutputValue, Record, Word};

type Stream = DataStream<Record, DEFAULT_CAPACITY>;

/// Pad live records into a full-capacity stream; overflow is the caller's fault.
pub fn build_stream(records: Vec<Record>) -> Result<Stream, ApiError> {
    Stream::from_live(records).map_err(|e| ApiError::BadRequest(e.to_string()))
}

struct Proven {
    commitment_hex: String,
    proof_b64: String,
    outputs: Vec<OutputValue>,
}

/// Verify a fresh proof (fail closed) and encode it for storage.
fn finish(
    vk: &VerifyingKey<Bn254>,
    proof: Proof<Bn254>,
    commitment: Fr,
    outputs: Vec<OutputValue>,
) -> Result<Proven, ApiError> {
    verify_proof(vk, &proof, commitment, &outputs)?;

    let proof_b64 = base64::engine::general_purpose::STANDARD.encode(serialize_proof(&proof)?);
    let commitment_hex = FrHex::from_fr(&commitment).map_err(|_| ApiError::Internal)?.hex;

    Ok(Proven { commitment_hex, proof_b64, outputs })
}

async fn store(state: &AppState, circuit: CircuitKind, proven: Proven) -> Result<ProofRecord, ApiError> {
    let record = ProofRecord {
        proof_id: Uuid::new_v4(),
        circuit,
        created_at: Utc::now(),
        commitment_hex: proven.commitment_hex,
        outputs: proven.outputs,
        proof_b64: proven.proof_b64,
        verified: true,
    };
    db::insert_proof(&state.db, &record).await?;
    Ok(record)
}

pub async fn prove_volatility_job(state: &AppState, records: Vec<Record>) -> Result<ProofResponse, ApiError> {
    let stream = build_stream(records)?;
    let keys = state.ensure_keys(CircuitKind::Volatility).await?;
    let config = state.settings.volatility;

    let (proven, report) = tokio::task::spawn_blocking(move || {
        // Use OS randomness for the proof to avoid deterministic proofs.
        let mut rng = rand::rngs::OsRng;
        let (proof, commitment, report) = prove_volatility(&mut rng, keys.pk.as_ref(), &config, &stream)?;
        let proven = finish(keys.vk.as_ref(), proof, commitment, report.outputs.clone())?;
        Ok::<_, ApiError>((proven, report))
    })
    .await
    .map_err(|_| ApiError::Internal)??;

    let record = store(state, CircuitKind::Volatility, proven).await?;
    let forecast = state.forecaster.lock().await.push(report.stats.std).map_err(|_| ApiError::Internal)?;

    info!(proof_id = %record.proof_id, live = report.live_records, std = %report.stats.std, %forecast, "volatility proof stored");

    Ok(ProofResponse {
        proof: record,
        live_records: report.live_records,
        stats: Some(report.stats),
        forecast: Some(forecast),
    })
}

pub async fn prove_activity_job(state: &AppState, user: Word, records: Vec<Record>) -> Result<ProofResponse, ApiError> {
    let stream = build_stream(records)?;
    let keys = state.ensure_keys(CircuitKind::Activity).await?;
    let config = state.settings.activity;

    let (proven, live_records) = tokio::task::spawn_blocking(move || {
        let mut rng = rand::rngs::OsRng;
        let (proof, commitment, report) = prove_activity(&mut rng, keys.pk.as_ref(), &config, &stream, &user)?;
        let proven = finish(keys.vk.as_ref(), proof, commitment, report.outputs)?;
        Ok::<_, ApiError>((proven, report.live_records))
    })
    .await
    .map_err(|_| ApiError::Internal)??;

    let record = store(state, CircuitKind::Activity, proven).await?;

    info!(proof_id = %record.proof_id, live = live_records, "activity proof stored");

    Ok(ProofResponse { proof: record, live_records, stats: None, forecast: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflowing_stream_is_a_bad_request() {
        let records = vec![Record::default(); DEFAULT_CAPACITY + 1];
        assert!(matches!(build_stream(records), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn short_stream_is_padded() {
        let live = Record { block_num: 1, event_id: Word::from_u64(1), fields: [Word::ZERO; 3] };
        let stream = build_stream(vec![live]).unwrap();
        assert_eq!(stream.capacity(), DEFAULT_CAPACITY);
        assert_eq!(stream.live_count(), 1);
    }
}
