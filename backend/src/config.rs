use std::path::PathBuf;
use zk_aggregate::config::{ActivityConfig, VolatilityConfig};
use zk_aggregate::constants::{BUY_BOTTLE_EVENT_ID, SWAP_EVENT_ID, SWAP_POOL_ADDRESS, SWAP_POOL_ID, TICK_SCALE};
use zk_aggregate::errors::ConfigError;

/// Service settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub addr: String,
    pub api_key: String,
    /// Local state (SQLite ledger, Groth16 keys) lives here.
    pub data_dir: PathBuf,
    pub volatility: VolatilityConfig,
    pub activity: ActivityConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let scale = match lookup("TICK_SCALE") {
            Some(s) => s.parse::<u64>().map_err(|e| ConfigError::InvalidNumber { name: "TICK_SCALE", reason: e.to_string() })?,
            None => TICK_SCALE,
        };

        let volatility = VolatilityConfig::from_hex(
            &get("SWAP_EVENT_ID", SWAP_EVENT_ID),
            &get("SWAP_POOL_ID", SWAP_POOL_ID),
            &get("SWAP_POOL_ADDRESS", SWAP_POOL_ADDRESS),
            scale,
        )?;
        let activity = ActivityConfig::from_hex(&get("ACTIVITY_EVENT_ID", BUY_BOTTLE_EVENT_ID))?;

        Ok(Self {
            addr: get("BACKEND_ADDR", "127.0.0.1:8080"),
            // In production, this should be a strong secret from the environment.
            api_key: get("API_KEY", "dev-secret-key"),
            data_dir: PathBuf::from(get("DATA_DIR", "data")),
            volatility,
            activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s.addr, "127.0.0.1:8080");
        assert_eq!(s.volatility, VolatilityConfig::default());
        assert_eq!(s.activity, ActivityConfig::default());
    }

    #[test]
    fn malformed_constant_fails_startup() {
        let env: HashMap<&str, &str> = [("SWAP_POOL_ID", "0xnot-hex")].into();
        assert!(Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).is_err());

        let env: HashMap<&str, &str> = [("TICK_SCALE", "ten")].into();
        assert!(Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).is_err());
    }
}
