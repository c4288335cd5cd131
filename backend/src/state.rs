use crate::config::Settings;
use crate::db::Db;
use crate::errors::ApiError;
use crate::models::CircuitKind;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use zk_aggregate::constants::{poseidon_config, DEFAULT_CAPACITY};
use zk_aggregate::forecast::VolatilityForecaster;
use zk_aggregate::groth16::{
    deserialize_pk, deserialize_vk, serialize_pk, serialize_vk, setup_activity_keys, setup_volatility_keys,
};
use zk_aggregate::types::Word;

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{ProvingKey, VerifyingKey};
use rand::rngs::OsRng;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub settings: Arc<Settings>,
    pub forecaster: Arc<Mutex<VolatilityForecaster>>,
    volatility_keys: Arc<OnceCell<ZkKeys>>,
    activity_keys: Arc<OnceCell<ZkKeys>>,
}

#[derive(Clone)]
pub struct ZkKeys {
    pub pk: Arc<ProvingKey<Bn254>>,
    pub vk: Arc<VerifyingKey<Bn254>>,
}

impl AppState {
    pub fn new(db: Db, settings: Settings, forecaster: VolatilityForecaster) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            forecaster: Arc::new(Mutex::new(forecaster)),
            volatility_keys: Arc::new(OnceCell::new()),
            activity_keys: Arc::new(OnceCell::new()),
        }
    }

    /// Ensure Groth16 keys for `kind` exist on disk and in memory.
    ///
    /// This runs the trusted setup (prototype) on first use. Key files are named by a fingerprint
    /// of the circuit configuration, so changing a filter constant never loads stale keys.
    pub async fn ensure_keys(&self, kind: CircuitKind) -> Result<ZkKeys, ApiError> {
        let settings = self.settings.clone();
        let cell = match kind {
            CircuitKind::Volatility => &self.volatility_keys,
            CircuitKind::Activity => &self.activity_keys,
        };

        cell.get_or_try_init(|| async move {
            tokio::task::spawn_blocking(move || load_or_setup(&settings, kind))
                .await
                .map_err(|_| ApiError::Internal)?
        })
        .await
        .cloned()
    }
}

fn load_or_setup(settings: &Settings, kind: CircuitKind) -> Result<ZkKeys, ApiError> {
    let keys_dir = settings.data_dir.join("keys");
    std::fs::create_dir_all(&keys_dir).map_err(|_| ApiError::Internal)?;

    let tag = format!("{}_{}", kind.as_str(), config_fingerprint(settings, kind));
    let pk_path = keys_dir.join(format!("{tag}_pk.bin"));
    let vk_path = keys_dir.join(format!("{tag}_vk.bin"));

    if pk_path.exists() && vk_path.exists() {
        let pk = deserialize_pk(&read(&pk_path)?).map_err(|_| ApiError::Internal)?;
        let vk = deserialize_vk(&read(&vk_path)?).map_err(|_| ApiError::Internal)?;
        tracing::info!(circuit = kind.as_str(), %tag, "loaded groth16 keys");
        return Ok(ZkKeys { pk: Arc::new(pk), vk: Arc::new(vk) });
    }

    tracing::info!(circuit = kind.as_str(), %tag, "running groth16 setup");

    // Trusted setup randomness (prototype).
    //
    // IMPORTANT: In production, use MPC setup or a transparent proof system.
    let mut rng = OsRng;
    let (pk, vk) = match kind {
        CircuitKind::Volatility => setup_volatility_keys::<DEFAULT_CAPACITY>(&settings.volatility, &mut rng)?,
        CircuitKind::Activity => setup_activity_keys::<DEFAULT_CAPACITY>(&settings.activity, &mut rng)?,
    };

    std::fs::write(&pk_path, serialize_pk(&pk)?).map_err(|_| ApiError::Internal)?;
    std::fs::write(&vk_path, serialize_vk(&vk)?).map_err(|_| ApiError::Internal)?;

    Ok(ZkKeys { pk: Arc::new(pk), vk: Arc::new(vk) })
}

fn read(path: &Path) -> Result<Vec<u8>, ApiError> {
    std::fs::read(path).map_err(|_| ApiError::Internal)
}

/// Short hex digest of everything a compiled circuit depends on: capacity, kind and constants.
pub fn config_fingerprint(settings: &Settings, kind: CircuitKind) -> String {
    let mut elems = vec![Fr::from(DEFAULT_CAPACITY as u64), Fr::from(kind as u64)];
    let mut push_word = |w: &Word| {
        let (hi, lo) = w.limbs();
        elems.extend([hi, lo]);
    };
    match kind {
        CircuitKind::Volatility => {
            let cfg = &settings.volatility;
            push_word(&cfg.event_id);
            push_word(&cfg.pool_id);
            push_word(&cfg.pool_address);
            elems.push(Fr::from(cfg.scale));
        }
        CircuitKind::Activity => push_word(&settings.activity.event_id),
    }

    let mut sponge = PoseidonSponge::<Fr>::new(&poseidon_config());
    sponge.absorb(&elems);
    let digest = sponge.squeeze_field_elements::<Fr>(1)[0];
    hex::encode(&digest.into_bigint().to_bytes_be()[..8])
}
