//! TF-AVM Core Library
//!
//! Turns a list of requested Azure services into a Terraform project built
//! from Azure Verified Modules, repairs it with a bounded correction loop,
//! and scores the result for training.

/// Declare a lazily compiled regex. A pattern that fails to compile leaves
/// the static as `None` and every check that uses it is skipped.
macro_rules! lazy_regex {
    ($name:ident, $pattern:expr $(,)?) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($pattern).ok());
    };
}

pub mod catalog;
pub mod correction;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod obs;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod reward;
pub mod rollout;
pub mod settings;
pub mod telemetry;
pub mod trace;

pub use catalog::{normalize_identifier, Catalog, CatalogEntry, Category, DefaultInput};

pub use correction::{
    classify, extract_code_block, CorrectionOutcome, CorrectionPolicy, ErrorKind, LoopState,
    SelfCorrector, TextGenerator, ValidationIssue,
};

pub use dataset::{read_jsonl, write_jsonl, TrainingDataset, TrainingExample};

pub use error::{AvmError, CatalogError, Result};

pub use generator::{validate_structure, ProjectGenerator, StructureCheck};

pub use project::{read_project, write_project, GeneratedFile, ProjectOutput, WriteReport};

pub use registry::{parse_module_source, RegistryClient, VersionCache};

pub use resolver::{Recommendation, Resolution, ResolvedRequest, Resolver};

pub use reward::{
    FormatCheck, FormatChecker, RewardBreakdown, RewardCalculator, RewardComponent, RewardWeights,
};

pub use rollout::RolloutGate;

pub use settings::Settings;

pub use telemetry::init_tracing;

pub use trace::{sanitize, LogSink, MemorySink, NoopSink, TaskTracer, TelemetrySink, TraceEvent};
