//! Types shared between the circuits and the host-side prover/verifier.

use crate::constants::{LIMB_BITS, RECORD_FIELDS};
use crate::errors::ConfigError;
use crate::field::Uint248;
use ark_bn254::Fr;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte big-endian word, as found in log topics and data slots.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Word(pub [u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);

    /// Parse `0x`-prefixed (or bare) hex. Shorter inputs are left-padded, as addresses are in
    /// topics.
    pub fn from_hex(name: &'static str, s: &str) -> Result<Self, ConfigError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| ConfigError::InvalidHex { name, reason: e.to_string() })?;
        if bytes.len() > 32 {
            return Err(ConfigError::TooLong { name, max: 32, got: bytes.len() });
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn from_u64(v: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        Self(out)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// `(hi, lo)` 128-bit limbs as field elements, matching the circuit allocation.
    pub fn limbs(&self) -> (Fr, Fr) {
        let limb_bytes = LIMB_BITS / 8;
        let hi = u128::from_be_bytes(self.0[..limb_bytes].try_into().unwrap_or([0u8; 16]));
        let lo = u128::from_be_bytes(self.0[limb_bytes..].try_into().unwrap_or([0u8; 16]));
        (Fr::from(hi), Fr::from(lo))
    }

    /// Low 248 bits as an integer. Total: the top byte is discarded.
    pub fn to_uint248(&self) -> Uint248 {
        Uint248::from_be_bytes(&self.0[1..]).unwrap_or_default()
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self.to_hex())
    }
}

impl Serialize for Word {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Word::from_hex("word", &s).map_err(serde::de::Error::custom)
    }
}

/// One decoded log record.
///
/// `Record::default()` is the all-zero padding record. Its event id never matches a real
/// event signature, so a filter leaves padding dead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Block the log was emitted in.
    pub block_num: u64,
    /// topic0: keccak of the event signature.
    pub event_id: Word,
    /// Extracted topics / data words, in the order the retrieval side requested them.
    pub fields: [Word; RECORD_FIELDS],
}

/// One value handed to the output sink, tagged with its public bit width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputValue {
    pub value: Uint248,
    pub bits: u16,
}

/// JSON-friendly representation of a field element.
///
/// Fr values are exposed as hex strings of the canonical compressed encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrHex {
    pub hex: String,
}

impl FrHex {
    pub fn from_fr(x: &Fr) -> Result<Self, String> {
        let mut bytes = Vec::new();
        x.serialize_compressed(&mut bytes).map_err(|e| format!("field serialization: {e}"))?;
        Ok(Self { hex: hex::encode(bytes) })
    }

    pub fn to_fr(&self) -> Result<Fr, String> {
        let bytes = hex::decode(&self.hex).map_err(|e| format!("invalid hex: {e}"))?;
        Fr::deserialize_compressed(&bytes[..]).map_err(|e| format!("invalid field bytes: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_is_left_padded() {
        let w = Word::from_hex("addr", "0xEf1c6E67703c7BD7107eed8303Fbe6EC2554BF6B").unwrap();
        assert_eq!(&w.0[..12], &[0u8; 12]);
        assert_eq!(w.0[12], 0xef);
        assert!(w.to_uint248().fits_bits(160));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(matches!(Word::from_hex("x", "0xzz"), Err(ConfigError::InvalidHex { .. })));
        let long = format!("0x{}", "11".repeat(33));
        assert!(matches!(Word::from_hex("x", &long), Err(ConfigError::TooLong { got: 33, .. })));
    }

    #[test]
    fn to_uint248_drops_top_byte() {
        let mut w = Word::from_u64(5);
        assert_eq!(w.to_uint248(), Uint248::from_u64(5));
        w.0[0] = 0xff;
        assert_eq!(w.to_uint248(), Uint248::from_u64(5));
    }

    #[test]
    fn limbs_split_at_sixteen_bytes() {
        let w = Word::from_u64(9);
        let (hi, lo) = w.limbs();
        assert_eq!(hi, Fr::from(0u64));
        assert_eq!(lo, Fr::from(9u64));
    }

    #[test]
    fn fr_hex_round_trips() {
        let x = Fr::from(1234u64);
        let h = FrHex::from_fr(&x).unwrap();
        assert_eq!(h.to_fr().unwrap(), x);
    }
}
