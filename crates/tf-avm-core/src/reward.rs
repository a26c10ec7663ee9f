//! Multi-component reward for generated projects.
//!
//! Components are computed independently and combined linearly. The
//! calculator only reads the project; external tool failures are downgraded
//! to "cannot verify" and never surface as errors.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AvmError, Result};
use crate::generator::{validate_structure, RESOURCE_GROUP_REF};
use crate::obs;
use crate::project::ProjectOutput;

/// Module blocks needed for a full `modules_used` score.
pub const DEFAULT_MODULE_THRESHOLD: f64 = 5.0;

lazy_regex!(MODULE_BLOCK, r#"(?m)^\s*module\s+""#);

/// Reward component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardComponent {
    SyntaxValid,
    FormatValid,
    ModulesUsed,
    DependenciesResolved,
    PlanSuccess,
    UserFeedback,
}

impl RewardComponent {
    pub const ALL: [RewardComponent; 6] = [
        RewardComponent::SyntaxValid,
        RewardComponent::FormatValid,
        RewardComponent::ModulesUsed,
        RewardComponent::DependenciesResolved,
        RewardComponent::PlanSuccess,
        RewardComponent::UserFeedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RewardComponent::SyntaxValid => "syntax_valid",
            RewardComponent::FormatValid => "format_valid",
            RewardComponent::ModulesUsed => "modules_used",
            RewardComponent::DependenciesResolved => "dependencies_resolved",
            RewardComponent::PlanSuccess => "plan_success",
            RewardComponent::UserFeedback => "user_feedback",
        }
    }

    fn default_weight(&self) -> f64 {
        match self {
            RewardComponent::SyntaxValid => 0.3,
            RewardComponent::FormatValid => 0.1,
            RewardComponent::ModulesUsed => 0.2,
            RewardComponent::DependenciesResolved => 0.1,
            RewardComponent::PlanSuccess => 0.2,
            RewardComponent::UserFeedback => 0.1,
        }
    }
}

impl std::str::FromStr for RewardComponent {
    type Err = AvmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AvmError::UnknownRewardComponent(s.to_string()))
    }
}

/// Per-component weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    weights: BTreeMap<RewardComponent, f64>,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            weights: RewardComponent::ALL
                .into_iter()
                .map(|c| (c, c.default_weight()))
                .collect(),
        }
    }
}

impl RewardWeights {
    /// Defaults with the given overrides merged on top.
    ///
    /// Unknown component names and negative or non-finite weights are
    /// configuration errors.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut weights = Self::default();
        for (name, value) in overrides {
            let component: RewardComponent = name.parse()?;
            if !value.is_finite() || value < 0.0 {
                return Err(AvmError::InvalidWeight {
                    component: name.to_string(),
                    value,
                });
            }
            weights.weights.insert(component, value);
        }
        Ok(weights)
    }

    pub fn get(&self, component: RewardComponent) -> f64 {
        self.weights.get(&component).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Outcome of checking one file's formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum FormatCheck {
    Formatted,
    Unformatted(String),
    /// The check could not run; treated as a pass.
    Unknown(String),
}

impl FormatCheck {
    pub fn passes(&self) -> bool {
        !matches!(self, FormatCheck::Unformatted(_))
    }
}

/// External formatting oracle.
#[async_trait]
pub trait FormatChecker: Send + Sync {
    async fn is_available(&self) -> bool;
    async fn check(&self, content: &str) -> FormatCheck;
}

/// Scalar reward plus per-component values and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub total: f64,
    pub components: BTreeMap<RewardComponent, f64>,
    pub metadata: Map<String, Value>,
}

impl RewardBreakdown {
    pub fn component(&self, component: RewardComponent) -> f64 {
        self.components.get(&component).copied().unwrap_or(0.0)
    }
}

/// Scores generated projects.
pub struct RewardCalculator {
    weights: RewardWeights,
    module_threshold: f64,
    format_checker: Option<Arc<dyn FormatChecker>>,
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self::new(RewardWeights::default())
    }
}

impl RewardCalculator {
    pub fn new(weights: RewardWeights) -> Self {
        Self {
            weights,
            module_threshold: DEFAULT_MODULE_THRESHOLD,
            format_checker: None,
        }
    }

    pub fn with_module_threshold(mut self, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AvmError::Config(format!(
                "module threshold must be positive, got {threshold}"
            )));
        }
        self.module_threshold = threshold;
        Ok(self)
    }

    pub fn with_format_checker(mut self, checker: Arc<dyn FormatChecker>) -> Self {
        self.format_checker = Some(checker);
        self
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    /// Score a project. `feedback` defaults to 0.0.
    pub async fn score(&self, project: &ProjectOutput, feedback: Option<f64>) -> RewardBreakdown {
        let mut components = BTreeMap::new();
        let mut metadata = Map::new();
        let root = project.root().map(|f| f.content.as_str());

        components.insert(RewardComponent::SyntaxValid, syntax_reward(root, &mut metadata));
        components.insert(
            RewardComponent::FormatValid,
            self.format_reward(project, &mut metadata).await,
        );
        components.insert(
            RewardComponent::ModulesUsed,
            self.module_reward(root, &mut metadata),
        );
        components.insert(
            RewardComponent::DependenciesResolved,
            dependency_reward(root, &mut metadata),
        );
        metadata.insert("plan_skipped".to_string(), Value::from("sandbox_required"));
        components.insert(RewardComponent::PlanSuccess, 0.0);
        components.insert(RewardComponent::UserFeedback, feedback.unwrap_or(0.0));

        let total: f64 = components
            .iter()
            .map(|(c, value)| self.weights.get(*c) * value)
            .sum();

        obs::emit_reward_scored(total, root.is_some());
        RewardBreakdown {
            total,
            components,
            metadata,
        }
    }

    async fn format_reward(&self, project: &ProjectOutput, metadata: &mut Map<String, Value>) -> f64 {
        let checker = match &self.format_checker {
            Some(checker) if checker.is_available().await => checker,
            _ => {
                metadata.insert("format_skipped".to_string(), Value::from("checker_not_available"));
                return 0.0;
            }
        };

        for file in project.config_files() {
            match checker.check(&file.content).await {
                FormatCheck::Formatted => {}
                FormatCheck::Unknown(reason) => {
                    obs::emit_tool_downgraded("format_check", &reason);
                }
                FormatCheck::Unformatted(_) => {
                    metadata.insert("format_issues".to_string(), Value::from(file.name.clone()));
                    return 0.0;
                }
            }
        }

        metadata.insert("format_valid".to_string(), Value::Bool(true));
        1.0
    }

    fn module_reward(&self, root: Option<&str>, metadata: &mut Map<String, Value>) -> f64 {
        let count = root.map(count_module_blocks).unwrap_or(0);
        metadata.insert("modules_count".to_string(), Value::from(count));
        if root.is_none() {
            return 0.0;
        }
        (count as f64 / self.module_threshold).min(1.0)
    }
}

/// Number of `module "..."` blocks in configuration text.
pub fn count_module_blocks(content: &str) -> usize {
    MODULE_BLOCK
        .as_ref()
        .map(|re| re.find_iter(content).count())
        .unwrap_or(0)
}

fn syntax_reward(root: Option<&str>, metadata: &mut Map<String, Value>) -> f64 {
    let Some(content) = root else {
        metadata.insert("syntax_error".to_string(), Value::from("no_main_tf"));
        return -1.0;
    };
    let check = validate_structure(content);
    metadata.insert("syntax_valid".to_string(), Value::Bool(check.valid));
    metadata.insert("syntax_message".to_string(), Value::from(check.message));
    if check.valid {
        1.0
    } else {
        -0.5
    }
}

fn dependency_reward(root: Option<&str>, metadata: &mut Map<String, Value>) -> f64 {
    let Some(content) = root else {
        return 0.0;
    };
    let has_depends_on = content.contains("depends_on");
    let has_rg_reference = content.contains(RESOURCE_GROUP_REF);
    metadata.insert("has_depends_on".to_string(), Value::Bool(has_depends_on));
    metadata.insert("has_rg_reference".to_string(), Value::Bool(has_rg_reference));

    let mut reward = 0.0;
    if has_rg_reference {
        reward += 0.5;
    }
    if has_depends_on {
        reward += 0.5;
    }
    reward
}
