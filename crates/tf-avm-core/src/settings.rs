//! File-based settings.
//!
//! Every section is optional; missing keys take their defaults. Validation
//! runs at load time so malformed values surface immediately.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::correction::CorrectionPolicy;
use crate::error::{AvmError, Result};
use crate::reward::{RewardCalculator, RewardWeights, DEFAULT_MODULE_THRESHOLD};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub correction: CorrectionSettings,
    pub reward: RewardSettings,
    pub checker: CheckerSettings,
    pub registry: RegistrySettings,
    pub generator: GeneratorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    pub max_iterations: u32,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            max_iterations: CorrectionPolicy::default().max_iterations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    pub module_threshold: f64,
    /// Overrides merged over the default weights.
    pub weights: BTreeMap<String, f64>,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            module_threshold: DEFAULT_MODULE_THRESHOLD,
            weights: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerSettings {
    pub binary: String,
    pub timeout_secs: u64,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub api_base: String,
    /// Defaults to `<cache dir>/tf-avm/versions.json` when unset.
    pub cache_path: Option<PathBuf>,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            api_base: "https://registry.terraform.io/v1/modules".to_string(),
            cache_path: None,
            ttl_secs: 3600,
            timeout_secs: 10,
            max_concurrent: 10,
        }
    }
}

impl RegistrySettings {
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            std::env::var_os("XDG_CACHE_HOME")
                .map(PathBuf::from)
                .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
                .unwrap_or_else(std::env::temp_dir)
                .join("tf-avm")
                .join("versions.json")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub default_location: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_location: "eastus".to_string(),
        }
    }
}

impl Settings {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from a file when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.reward_weights()?;
        if !self.reward.module_threshold.is_finite() || self.reward.module_threshold <= 0.0 {
            return Err(AvmError::Config(format!(
                "reward.module_threshold must be positive, got {}",
                self.reward.module_threshold
            )));
        }
        if self.checker.timeout_secs == 0 || self.registry.timeout_secs == 0 {
            return Err(AvmError::Config("timeouts must be at least one second".to_string()));
        }
        if self.registry.max_concurrent == 0 {
            return Err(AvmError::Config(
                "registry.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.checker.binary.trim().is_empty() {
            return Err(AvmError::Config("checker.binary is empty".to_string()));
        }
        Ok(())
    }

    pub fn correction_policy(&self) -> CorrectionPolicy {
        CorrectionPolicy {
            max_iterations: self.correction.max_iterations,
        }
    }

    pub fn reward_weights(&self) -> Result<RewardWeights> {
        RewardWeights::with_overrides(self.reward.weights.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Reward calculator without a format checker attached.
    pub fn reward_calculator(&self) -> Result<RewardCalculator> {
        RewardCalculator::new(self.reward_weights()?).with_module_threshold(self.reward.module_threshold)
    }
}
