use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zk_aggregate::constants::{ACTIVITY_OUTPUT_BITS, VOLATILITY_OUTPUT_BITS};
use zk_aggregate::field::Uint248;
use zk_aggregate::stats::DeltaStats;
use zk_aggregate::types::{OutputValue, Record, Word};

/// Which statistics circuit a proof belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Volatility,
    Activity,
}

impl CircuitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitKind::Volatility => "volatility",
            CircuitKind::Activity => "activity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "volatility" => Some(CircuitKind::Volatility),
            "activity" => Some(CircuitKind::Activity),
            _ => None,
        }
    }

    /// Published output widths, in sink order.
    pub fn output_bits(self) -> &'static [u16] {
        match self {
            CircuitKind::Volatility => &VOLATILITY_OUTPUT_BITS,
            CircuitKind::Activity => &ACTIVITY_OUTPUT_BITS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveVolatilityRequest {
    /// Decoded swap logs in chain order. At most the circuit capacity.
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveActivityRequest {
    /// Address whose events are counted (20 bytes, hex).
    pub user: String,
    pub records: Vec<Record>,
}

/// A stored proof together with everything needed to verify it independently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofRecord {
    pub proof_id: Uuid,
    pub circuit: CircuitKind,
    pub created_at: DateTime<Utc>,
    pub commitment_hex: String,
    pub outputs: Vec<OutputValue>,
    pub proof_b64: String,
    /// The backend verified the proof before storing it.
    pub verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    #[serde(flatten)]
    pub proof: ProofRecord,

    /// Records that passed the circuit's filter (matching swaps, or the user's events).
    pub live_records: usize,

    /// Volatility only: the full two-pass statistics behind the published std.
    pub stats: Option<DeltaStats>,

    /// Volatility only: next-window forecast including this observation.
    pub forecast: Option<Uint248>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZkVkResponse {
    pub circuit: CircuitKind,
    pub curve: String,
    pub proof_system: String,
    pub capacity: usize,
    pub output_bits: Vec<u16>,
    pub vk_b64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub circuit: CircuitKind,

    /// Defaults to the server's current key for `circuit`.
    pub vk_b64: Option<String>,
    pub proof_b64: String,

    pub commitment_hex: String,
    /// Output values in sink order; widths are implied by `circuit`.
    pub outputs: Vec<Uint248>,
}

impl VerifyRequest {
    /// Pair the submitted values with the circuit's published widths.
    pub fn tagged_outputs(&self) -> Result<Vec<OutputValue>, ApiError> {
        let bits = self.circuit.output_bits();
        if self.outputs.len() != bits.len() {
            return Err(ApiError::BadRequest(format!(
                "{} circuit publishes {} outputs, got {}",
                self.circuit.as_str(),
                bits.len(),
                self.outputs.len()
            )));
        }

        self.outputs
            .iter()
            .zip(bits)
            .map(|(value, &bits)| {
                if value.fits_bits(bits as usize) {
                    Ok(OutputValue { value: *value, bits })
                } else {
                    Err(ApiError::BadRequest(format!("output {value} does not fit in {bits} bits")))
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
}
