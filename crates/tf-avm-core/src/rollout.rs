//! Deterministic session rollout gate.
//!
//! A session is on the gated path when the SHA-256 of its id, read as a
//! big-endian integer, modulo 100 is below the rollout fraction scaled to a
//! percentage. The same id always lands in the same bucket.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AvmError, Result};

/// `"true"` enables the gate.
pub const ENABLED_VAR: &str = "TF_AVM_ROLLOUT_ENABLED";
/// Fraction of sessions in `[0.0, 1.0]`.
pub const FRACTION_VAR: &str = "TF_AVM_ROLLOUT_FRACTION";

/// Rollout gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RolloutGate {
    pub enabled: bool,
    pub fraction: f64,
}

impl Default for RolloutGate {
    fn default() -> Self {
        Self {
            enabled: false,
            fraction: 0.0,
        }
    }
}

impl RolloutGate {
    pub fn new(enabled: bool, fraction: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(AvmError::Config(format!(
                "rollout fraction must be within 0.0..=1.0, got {fraction}"
            )));
        }
        Ok(Self { enabled, fraction })
    }

    /// Read the gate from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the gate through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup(ENABLED_VAR).is_some_and(|v| v.trim() == "true");
        let fraction = match lookup(FRACTION_VAR) {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                AvmError::Config(format!("{FRACTION_VAR} is not a number: {raw:?}"))
            })?,
            None => 0.0,
        };
        Self::new(enabled, fraction)
    }

    /// Whether the session takes the gated path. No session, no rollout.
    pub fn assign(&self, session_id: Option<&str>) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(session_id) = session_id else {
            return false;
        };
        (bucket(session_id) as f64) < self.fraction * 100.0
    }
}

/// `sha256(session_id) mod 100`, digest read big-endian.
pub fn bucket(session_id: &str) -> u32 {
    Sha256::digest(session_id.as_bytes())
        .iter()
        .fold(0u32, |acc, byte| (acc * 256 + u32::from(*byte)) % 100)
}
