//! Error taxonomy for TF-AVM.
//!
//! Only hard failures live here. Resolution misses, structural validation
//! failures, correction-extraction failures and external tool failures are
//! reported as data by the components that hit them.

/// Errors produced while building or validating a module catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog entry {name:?} has an empty {field}")]
    EmptyField { name: String, field: &'static str },

    #[error("catalog entry {name}: source {source_id:?} does not follow the Azure/avm-<kind>-<name>/<provider> convention")]
    InvalidSource { name: String, source_id: String },

    #[error("duplicate catalog entry: {0}")]
    DuplicateName(String),

    #[error("catalog entry {name} depends on unknown module {dependency}")]
    UnknownDependency { name: String, dependency: String },
}

/// TF-AVM errors.
#[derive(Debug, thiserror::Error)]
pub enum AvmError {
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown reward component: {0}")]
    UnknownRewardComponent(String),

    #[error("invalid weight for {component}: {value}")]
    InvalidWeight { component: String, value: f64 },

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AvmError {
    fn from(err: reqwest::Error) -> Self {
        AvmError::Http(err.to_string())
    }
}

/// Result type for TF-AVM operations.
pub type Result<T> = std::result::Result<T, AvmError>;
