//! Pipeline configuration.
//!
//! Filter constants are parsed once, up front; a malformed constant fails here before any
//! constraint system is built. A config is immutable for the life of one computation.

use crate::constants::{
    BUY_BOTTLE_EVENT_ID, SWAP_EVENT_ID, SWAP_POOL_ADDRESS, SWAP_POOL_ID, TICK_SCALE,
};
use crate::errors::ConfigError;
use crate::field::Uint248;
use crate::types::Word;
use serde::{Deserialize, Serialize};

/// Constants for the swap-volatility pipeline.
///
/// Record layout expected: `fields[0]` pool id, `fields[1]` sender, `fields[2]` tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityConfig {
    pub event_id: Word,
    pub pool_id: Word,
    pub pool_address: Word,
    pub scale: u64,
}

impl VolatilityConfig {
    pub fn from_hex(event_id: &str, pool_id: &str, pool_address: &str, scale: u64) -> Result<Self, ConfigError> {
        if scale == 0 {
            return Err(ConfigError::ZeroScale);
        }
        let pool_address = parse_address("pool_address", pool_address)?;
        Ok(Self {
            event_id: Word::from_hex("event_id", event_id)?,
            pool_id: Word::from_hex("pool_id", pool_id)?,
            pool_address,
            scale,
        })
    }

    pub fn pool_address_uint(&self) -> Uint248 {
        self.pool_address.to_uint248()
    }

    pub fn scale_uint(&self) -> Uint248 {
        Uint248::from_u64(self.scale)
    }
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            event_id: Word::from_hex("event_id", SWAP_EVENT_ID).unwrap_or_default(),
            pool_id: Word::from_hex("pool_id", SWAP_POOL_ID).unwrap_or_default(),
            pool_address: Word::from_hex("pool_address", SWAP_POOL_ADDRESS).unwrap_or_default(),
            scale: TICK_SCALE,
        }
    }
}

/// Constants for the per-user activity pipeline.
///
/// Record layout expected: `fields[0]` user address. The user itself is a per-proof public
/// input, not a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub event_id: Word,
}

impl ActivityConfig {
    pub fn from_hex(event_id: &str) -> Result<Self, ConfigError> {
        Ok(Self { event_id: Word::from_hex("event_id", event_id)? })
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self { event_id: Word::from_hex("event_id", BUY_BOTTLE_EVENT_ID).unwrap_or_default() }
    }
}

/// Parse a 20-byte address into a left-padded word.
pub fn parse_address(name: &'static str, s: &str) -> Result<Word, ConfigError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() > 40 {
        return Err(ConfigError::TooLong { name, max: 20, got: stripped.len().div_ceil(2) });
    }
    Word::from_hex(name, s)
}
