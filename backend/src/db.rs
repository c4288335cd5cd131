use crate::errors::ApiError;
use crate::models::{CircuitKind, ProofRecord};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use uuid::Uuid;
use zk_aggregate::field::Uint248;
use zk_aggregate::types::OutputValue;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .map_err(|_| ApiError::Internal)
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // Append-only proof ledger.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS proofs (
  id TEXT PRIMARY KEY,
  circuit TEXT NOT NULL,
  created_at TEXT NOT NULL,
  commitment_hex TEXT NOT NULL,
  outputs_json TEXT NOT NULL,
  proof_b64 TEXT NOT NULL,
  verified INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS proofs_by_circuit ON proofs (circuit, created_at);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub async fn insert_proof(db: &Db, proof: &ProofRecord) -> Result<(), ApiError> {
    let outputs_json = serde_json::to_string(&proof.outputs).map_err(|_| ApiError::Internal)?;

    sqlx::query(
        r#"INSERT INTO proofs (id, circuit, created_at, commitment_hex, outputs_json, proof_b64, verified)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(proof.proof_id.to_string())
    .bind(proof.circuit.as_str())
    .bind(proof.created_at.to_rfc3339())
    .bind(&proof.commitment_hex)
    .bind(outputs_json)
    .bind(&proof.proof_b64)
    .bind(if proof.verified { 1i64 } else { 0i64 })
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub async fn get_proof(db: &Db, proof_id: Uuid) -> Result<Option<ProofRecord>, ApiError> {
    let row = sqlx::query(
        r#"SELECT circuit, created_at, commitment_hex, outputs_json, proof_b64, verified
           FROM proofs WHERE id = ?"#,
    )
    .bind(proof_id.to_string())
    .fetch_optional(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let Some(row) = row else { return Ok(None); };

    let circuit: String = row.get(0);
    let circuit = CircuitKind::parse(&circuit).ok_or(ApiError::Internal)?;

    let created_at: String = row.get(1);
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| ApiError::Internal)?
        .with_timezone(&Utc);

    let outputs_json: String = row.get(3);
    let outputs: Vec<OutputValue> = serde_json::from_str(&outputs_json).map_err(|_| ApiError::Internal)?;
    let verified: i64 = row.get(5);

    Ok(Some(ProofRecord {
        proof_id,
        circuit,
        created_at,
        commitment_hex: row.get(2),
        outputs,
        proof_b64: row.get(4),
        verified: verified == 1,
    }))
}

/// Published std values of the most recent volatility proofs, oldest first.
pub async fn recent_volatility_std(db: &Db, limit: u64) -> Result<Vec<Uint248>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT outputs_json FROM proofs
           WHERE circuit = 'volatility' AND verified = 1
           ORDER BY created_at DESC
           LIMIT ?"#,
    )
    .bind(limit as i64)
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows.into_iter().rev() {
        let outputs_json: String = row.get(0);
        let outputs: Vec<OutputValue> = serde_json::from_str(&outputs_json).map_err(|_| ApiError::Internal)?;
        let std = outputs.first().ok_or(ApiError::Internal)?;
        out.push(std.value);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn memory_db() -> Db {
        // One connection: every in-memory connection is its own database.
        let db = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        init_schema(&db).await.unwrap();
        db
    }

    fn record(circuit: CircuitKind, created_at: DateTime<Utc>, values: &[u64]) -> ProofRecord {
        ProofRecord {
            proof_id: Uuid::new_v4(),
            circuit,
            created_at,
            commitment_hex: "00".repeat(32),
            outputs: values.iter().map(|v| OutputValue { value: Uint248::from_u64(*v), bits: 248 }).collect(),
            proof_b64: "cHJvb2Y=".to_string(),
            verified: true,
        }
    }

    #[tokio::test]
    async fn proof_round_trips_through_ledger() {
        let db = memory_db().await;
        let proof = record(CircuitKind::Activity, Utc::now(), &[3, 5, 7]);
        insert_proof(&db, &proof).await.unwrap();

        let loaded = get_proof(&db, proof.proof_id).await.unwrap().unwrap();
        assert_eq!(loaded.circuit, CircuitKind::Activity);
        assert_eq!(loaded.outputs, proof.outputs);
        assert!(loaded.verified);

        assert!(get_proof(&db, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn std_history_is_oldest_first_and_volatility_only() {
        let db = memory_db().await;
        let t0 = Utc::now();
        for (i, std) in [10u64, 20, 30].iter().enumerate() {
            let at = t0 + Duration::seconds(i as i64);
            insert_proof(&db, &record(CircuitKind::Volatility, at, &[*std])).await.unwrap();
        }
        insert_proof(&db, &record(CircuitKind::Activity, t0, &[99, 1, 1])).await.unwrap();

        let history = recent_volatility_std(&db, 2).await.unwrap();
        assert_eq!(history, vec![Uint248::from_u64(20), Uint248::from_u64(30)]);
    }
}
