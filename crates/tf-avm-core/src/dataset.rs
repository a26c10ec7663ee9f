//! Training dataset of prompts with expected services and modules.
//!
//! Records are written as newline-delimited JSON, architecture patterns
//! first, then one lookup example per catalog entry plus up to two alias
//! variants.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::Catalog;
use crate::error::Result;

/// One training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub task_id: String,
    #[serde(rename = "input")]
    pub input_prompt: String,
    pub expected_services: Vec<String>,
    pub expected_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_code: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// A reference architecture with the prompts that should produce it.
#[derive(Debug, Clone, Copy)]
pub struct ArchitecturePattern {
    pub name: &'static str,
    pub description: &'static str,
    pub services: &'static [&'static str],
    pub prompts: &'static [&'static str],
}

pub static ARCHITECTURE_PATTERNS: [ArchitecturePattern; 4] = [
    ArchitecturePattern {
        name: "web_app",
        description: "Simple web application with database",
        services: &["app_service", "sql_database", "key_vault"],
        prompts: &[
            "Create a web application with a SQL database",
            "I need Terraform for a website with database backend",
            "Generate infrastructure for a web app with secure secrets",
        ],
    },
    ArchitecturePattern {
        name: "microservices",
        description: "Microservices architecture with AKS",
        services: &[
            "kubernetes_cluster",
            "container_registry",
            "postgresql_flexible",
            "redis",
        ],
        prompts: &[
            "Create a microservices platform on Kubernetes",
            "I need AKS with container registry and databases",
            "Generate Terraform for a containerized application architecture",
        ],
    },
    ArchitecturePattern {
        name: "data_platform",
        description: "Data analytics platform",
        services: &[
            "storage_account",
            "azure_openai",
            "ai_search",
            "log_analytics_workspace",
        ],
        prompts: &[
            "Create a data analytics platform with AI capabilities",
            "I need storage, AI, and search for a data application",
            "Generate infrastructure for an AI-powered data platform",
        ],
    },
    ArchitecturePattern {
        name: "secure_network",
        description: "Secure network architecture",
        services: &[
            "virtual_network",
            "network_security_group",
            "application_gateway",
            "firewall",
        ],
        prompts: &[
            "Create a secure network with WAF and firewall",
            "I need a VNet with network security",
            "Generate Terraform for secure Azure networking",
        ],
    },
];

fn metadata(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

/// Dataset built over a catalog.
#[derive(Debug, Clone, Copy)]
pub struct TrainingDataset<'a> {
    catalog: &'a Catalog,
}

impl<'a> TrainingDataset<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// One example per pattern prompt, `<pattern>_<i>`.
    ///
    /// Expected modules are the canonical catalog names of the pattern's
    /// services; services the catalog cannot resolve are kept verbatim.
    pub fn pattern_examples(&self) -> Vec<TrainingExample> {
        ARCHITECTURE_PATTERNS
            .iter()
            .flat_map(|pattern| {
                let modules: Vec<String> = pattern
                    .services
                    .iter()
                    .map(|s| {
                        self.catalog
                            .lookup(s)
                            .map(|e| e.name.clone())
                            .unwrap_or_else(|| s.to_string())
                    })
                    .collect();
                pattern.prompts.iter().enumerate().map(move |(i, prompt)| TrainingExample {
                    task_id: format!("{}_{}", pattern.name, i),
                    input_prompt: prompt.to_string(),
                    expected_services: pattern.services.iter().map(|s| s.to_string()).collect(),
                    expected_modules: modules.clone(),
                    ground_truth_code: None,
                    metadata: metadata(json!({
                        "pattern": pattern.name,
                        "description": pattern.description,
                    })),
                })
            })
            .collect()
    }

    /// `lookup_<name>` per entry, plus `lookup_<name>_<alias>` for up to two
    /// aliases.
    pub fn lookup_examples(&self) -> Vec<TrainingExample> {
        let mut examples = Vec::new();
        for entry in self.catalog.entries() {
            examples.push(TrainingExample {
                task_id: format!("lookup_{}", entry.name),
                input_prompt: format!(
                    "What AVM module should I use for {}?",
                    entry.resource_type
                ),
                expected_services: Vec::new(),
                expected_modules: vec![entry.name.clone()],
                ground_truth_code: None,
                metadata: metadata(json!({
                    "module": entry.name,
                    "category": entry.category.as_str(),
                })),
            });
            for alias in entry.aliases.iter().take(2) {
                examples.push(TrainingExample {
                    task_id: format!("lookup_{}_{}", entry.name, alias),
                    input_prompt: format!("Find the AVM module for {alias}"),
                    expected_services: Vec::new(),
                    expected_modules: vec![entry.name.clone()],
                    ground_truth_code: None,
                    metadata: metadata(json!({ "module": entry.name, "alias": alias })),
                });
            }
        }
        examples
    }

    pub fn examples(&self) -> Vec<TrainingExample> {
        let mut all = self.pattern_examples();
        all.extend(self.lookup_examples());
        all
    }

    /// Write every example to `path`, creating parent directories. Returns
    /// the number of records written.
    pub fn write_jsonl(&self, path: &Path) -> Result<usize> {
        write_jsonl(path, &self.examples())
    }
}

/// Write examples as JSONL, creating parent directories.
pub fn write_jsonl(path: &Path, examples: &[TrainingExample]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for example in examples {
        serde_json::to_writer(&mut writer, example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(examples.len())
}

/// Read JSONL examples, skipping blank lines.
pub fn read_jsonl(path: &Path) -> Result<Vec<TrainingExample>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut examples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        examples.push(serde_json::from_str(&line)?);
    }
    Ok(examples)
}
