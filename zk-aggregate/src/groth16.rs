//! Groth16 prover/verifier orchestration for the statistics circuits.
//!
//! SECURITY NOTE (prototype): Groth16 requires a trusted setup that produces a proving key (PK)
//! and verifying key (VK). Keys are generated locally here. A deployment should use an MPC
//! ceremony (or a transparent proof system).
//!
//! Keys depend on the capacity `N` and, for the volatility circuit, on the configured filter
//! constants.

use crate::circuit::{ActivityCircuit, VolatilityCircuit};
use crate::commitment::stream_commitment;
use crate::config::{ActivityConfig, VolatilityConfig};
use crate::errors::PipelineError;
use crate::stats::{ActivityPipeline, ActivityReport, VolatilityPipeline, VolatilityReport};
use crate::stream::DataStream;
use crate::types::{OutputValue, Record, Word};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ZkError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("arkworks error: {0}")]
    Ark(String),
}

/// Compute (commitment, report) for a volatility stream.
///
/// This MUST match the circuit's logic.
pub fn compute_volatility<const N: usize>(
    config: &VolatilityConfig,
    stream: &DataStream<Record, N>,
) -> Result<(Fr, VolatilityReport), ZkError> {
    let commitment = stream_commitment(stream);
    let report = VolatilityPipeline::<N>::new(*config).run(stream.clone())?;
    Ok((commitment, report))
}

pub fn compute_activity<const N: usize>(
    config: &ActivityConfig,
    stream: &DataStream<Record, N>,
    user: &Word,
) -> Result<(Fr, ActivityReport), ZkError> {
    let commitment = stream_commitment(stream);
    let report = ActivityPipeline::<N>::new(*config).run(stream.clone(), user)?;
    Ok((commitment, report))
}

/// Convert (commitment, outputs) to the public-input vector expected by Groth16.
///
/// ORDERING MUST MATCH the circuits' `new_input` allocation order.
pub fn public_inputs_to_field_elems(commitment: Fr, outputs: &[OutputValue]) -> Vec<Fr> {
    let mut v = Vec::with_capacity(1 + outputs.len());
    v.push(commitment);
    v.extend(outputs.iter().map(|o| o.value.to_fr()));
    v
}

fn volatility_circuit<const N: usize>(
    config: &VolatilityConfig,
    stream: &DataStream<Record, N>,
    commitment: Fr,
    report: &VolatilityReport,
) -> VolatilityCircuit<N> {
    VolatilityCircuit::<N> {
        config: *config,
        records: stream.slots().to_vec(),
        live: stream.liveness().to_vec(),
        public_commitment: commitment,
        public_std: report.stats.std,
    }
}

fn activity_circuit<const N: usize>(
    config: &ActivityConfig,
    stream: &DataStream<Record, N>,
    user: &Word,
    commitment: Fr,
    report: &ActivityReport,
) -> ActivityCircuit<N> {
    ActivityCircuit::<N> {
        config: *config,
        records: stream.slots().to_vec(),
        live: stream.liveness().to_vec(),
        public_commitment: commitment,
        public_count: report.count,
        public_min_block_num: report.min_block_num,
        public_user: user.to_uint248(),
    }
}

fn all_padding<const N: usize>() -> Result<DataStream<Record, N>, ZkError> {
    DataStream::from_live(Vec::new()).map_err(|e| ZkError::Pipeline(e.into()))
}

/// Generate a Groth16 keypair for the volatility circuit.
///
/// For a fixed `N` and config, this must be run once.
pub fn setup_volatility_keys<const N: usize>(
    config: &VolatilityConfig,
    rng: &mut impl RngCore,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    // Constraints only depend on N and the config; an all-padding stream is a valid witness.
    let stream = all_padding::<N>()?;
    let (commitment, report) = compute_volatility::<N>(config, &stream)?;
    let circuit = volatility_circuit(config, &stream, commitment, &report);

    info!(capacity = N, "running volatility circuit setup");
    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    let vk = pk.vk.clone();
    Ok((pk, vk))
}

pub fn setup_activity_keys<const N: usize>(
    config: &ActivityConfig,
    rng: &mut impl RngCore,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    let stream = all_padding::<N>()?;
    let (commitment, report) = compute_activity::<N>(config, &stream, &Word::ZERO)?;
    let circuit = activity_circuit(config, &stream, &Word::ZERO, commitment, &report);

    info!(capacity = N, "running activity circuit setup");
    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    let vk = pk.vk.clone();
    Ok((pk, vk))
}

/// Prove the volatility statistic for a stream.
pub fn prove_volatility<const N: usize>(
    rng: &mut impl RngCore,
    pk: &ProvingKey<Bn254>,
    config: &VolatilityConfig,
    stream: &DataStream<Record, N>,
) -> Result<(Proof<Bn254>, Fr, VolatilityReport), ZkError> {
    let (commitment, report) = compute_volatility::<N>(config, stream)?;
    let circuit = volatility_circuit(config, stream, commitment, &report);

    let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    debug!(live = report.live_records, std = %report.stats.std, "volatility proof created");
    Ok((proof, commitment, report))
}

/// Prove a user's event count and earliest block for a stream.
pub fn prove_activity<const N: usize>(
    rng: &mut impl RngCore,
    pk: &ProvingKey<Bn254>,
    config: &ActivityConfig,
    stream: &DataStream<Record, N>,
    user: &Word,
) -> Result<(Proof<Bn254>, Fr, ActivityReport), ZkError> {
    let (commitment, report) = compute_activity::<N>(config, stream, user)?;
    let circuit = activity_circuit(config, stream, user, commitment, &report);

    let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    debug!(count = %report.count, "activity proof created");
    Ok((proof, commitment, report))
}

/// Verify a proof of either circuit against its commitment and ordered outputs.
pub fn verify_proof(
    vk: &VerifyingKey<Bn254>,
    proof: &Proof<Bn254>,
    commitment: Fr,
    outputs: &[OutputValue],
) -> Result<(), ZkError> {
    let public_inputs = public_inputs_to_field_elems(commitment, outputs);
    let pvk = prepare_verifying_key(vk);
    let ok = Groth16::<Bn254>::verify_proof(&pvk, proof, &public_inputs)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;
    if !ok {
        return Err(ZkError::VerificationFailed);
    }
    Ok(())
}

/// Serialize a proving key to bytes.
pub fn serialize_pk(pk: &ProvingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    pk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, ZkError> {
    ProvingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_vk(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    vk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, ZkError> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    proof
        .serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ZkError> {
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}
