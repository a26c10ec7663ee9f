//! Module catalog: the static table of Azure Verified Modules.
//!
//! The catalog is loaded once from a fixed definition table and is immutable
//! afterwards, so it can be shared freely between concurrent requests.
//! Lookups are exact after normalisation (case folding, hyphens and spaces
//! folded to underscores); fuzzy matching is the job of [`Catalog::search`].

mod definitions;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Required prefix of every module source identity.
pub const SOURCE_PREFIX: &str = "Azure/avm-";

static BUILTIN: LazyLock<Catalog> =
    LazyLock::new(|| Catalog::index_entries(definitions::builtin_entries()));

/// Module category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Compute,
    Networking,
    Storage,
    Database,
    Security,
    Messaging,
    Monitoring,
    Ai,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 8] = [
        Category::Compute,
        Category::Networking,
        Category::Storage,
        Category::Database,
        Category::Security,
        Category::Messaging,
        Category::Monitoring,
        Category::Ai,
    ];

    /// Order in which categories are presented in deployment reports.
    pub const DEPLOYMENT_ORDER: [Category; 8] = [
        Category::Security,
        Category::Networking,
        Category::Storage,
        Category::Database,
        Category::Compute,
        Category::Messaging,
        Category::Monitoring,
        Category::Ai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compute => "compute",
            Category::Networking => "networking",
            Category::Storage => "storage",
            Category::Database => "database",
            Category::Security => "security",
            Category::Messaging => "messaging",
            Category::Monitoring => "monitoring",
            Category::Ai => "ai",
        }
    }

    /// Parse a category name case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == lower)
    }

    /// Title-cased label for report headings.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Compute => "Compute",
            Category::Networking => "Networking",
            Category::Storage => "Storage",
            Category::Database => "Database",
            Category::Security => "Security",
            Category::Messaging => "Messaging",
            Category::Monitoring => "Monitoring",
            Category::Ai => "AI",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An input assignment written into every generated block for a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultInput {
    pub name: String,
    /// HCL expression text, emitted verbatim.
    pub value: String,
}

/// One reusable infrastructure module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical name, unique within a catalog.
    pub name: String,
    /// Registry source, e.g. `Azure/avm-res-web-site/azurerm`.
    pub source: String,
    /// Pinned fallback version.
    pub version: String,
    pub description: String,
    pub category: Category,
    /// Provider resource type the module deploys.
    pub resource_type: String,
    pub aliases: Vec<String>,
    /// Canonical names of modules required alongside this one.
    pub dependencies: Vec<String>,
    pub outputs: Vec<String>,
    pub defaults: Vec<DefaultInput>,
    pub example_usage: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
        category: Category,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            version: version.into(),
            description: description.into(),
            category,
            resource_type: String::new(),
            aliases: Vec::new(),
            dependencies: Vec::new(),
            outputs: Vec::new(),
            defaults: Vec::new(),
            example_usage: None,
        }
    }

    pub fn with_resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = resource_type.to_string();
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_default(mut self, name: &str, value: &str) -> Self {
        self.defaults.push(DefaultInput {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example_usage = Some(example.trim().to_string());
        self
    }

    /// Pessimistic `~> MAJOR.MINOR` constraint derived from the pinned version.
    pub fn version_constraint(&self) -> String {
        let major_minor: Vec<&str> = self.version.split('.').take(2).collect();
        format!("~> {}", major_minor.join("."))
    }

    /// Registry module name, e.g. `avm-res-web-site`.
    pub fn registry_name(&self) -> &str {
        self.source.split('/').nth(1).unwrap_or(&self.name)
    }

    /// Check the entry invariants.
    pub fn validate(&self) -> std::result::Result<(), CatalogError> {
        let required = [
            ("name", &self.name),
            ("source", &self.source),
            ("version", &self.version),
            ("description", &self.description),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CatalogError::EmptyField {
                    name: self.name.clone(),
                    field,
                });
            }
        }

        if !is_valid_source(&self.source) {
            return Err(CatalogError::InvalidSource {
                name: self.name.clone(),
                source_id: self.source.clone(),
            });
        }

        Ok(())
    }

    fn matches_query(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query)
            || self.description.to_lowercase().contains(query)
            || self.category.as_str().contains(query)
            || self.aliases.iter().any(|a| a.to_lowercase().contains(query))
    }
}

/// `Azure/avm-<kind>-<name>/<provider>` with exactly three non-empty segments.
fn is_valid_source(source: &str) -> bool {
    let parts: Vec<&str> = source.split('/').collect();
    parts.len() == 3 && source.starts_with(SOURCE_PREFIX) && parts.iter().all(|p| !p.is_empty())
}

/// Fold an identifier to its lookup key.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Immutable, indexed module catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl Catalog {
    /// The built-in catalog, indexed on first use.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Build a catalog from custom entries, enforcing every invariant.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut seen = HashMap::new();
        for entry in &entries {
            entry.validate()?;
            if seen.insert(normalize_identifier(&entry.name), ()).is_some() {
                return Err(CatalogError::DuplicateName(entry.name.clone()).into());
            }
        }
        for entry in &entries {
            for dep in &entry.dependencies {
                if !seen.contains_key(&normalize_identifier(dep)) {
                    return Err(CatalogError::UnknownDependency {
                        name: entry.name.clone(),
                        dependency: dep.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(Self::index_entries(entries))
    }

    fn index_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_name.entry(normalize_identifier(&entry.name)).or_insert(idx);
            for alias in &entry.aliases {
                by_alias.entry(normalize_identifier(alias)).or_insert(idx);
            }
        }
        Self {
            entries,
            by_name,
            by_alias,
        }
    }

    /// All entries in definition order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup: canonical name first, then aliases.
    pub fn lookup(&self, identifier: &str) -> Option<&CatalogEntry> {
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return None;
        }
        self.by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .map(|&idx| &self.entries[idx])
    }

    /// Case-insensitive substring search over name, description, category
    /// and aliases, in definition order.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.matches_query(&query))
            .collect()
    }

    /// Entries in a category. Unknown categories yield an empty list.
    pub fn list_by_category(&self, category: &str) -> Vec<&CatalogEntry> {
        match Category::parse(category) {
            Some(cat) => self.entries.iter().filter(|e| e.category == cat).collect(),
            None => Vec::new(),
        }
    }

    /// Categories that have at least one entry, in declaration order.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.entries.iter().any(|e| e.category == *c))
            .collect()
    }

    /// Direct dependencies of a module, in declared order.
    pub fn dependencies_of(&self, identifier: &str) -> Vec<&CatalogEntry> {
        self.lookup(identifier)
            .map(|entry| {
                entry
                    .dependencies
                    .iter()
                    .filter_map(|d| self.lookup(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Markdown listing grouped by category, optionally filtered to one.
    pub fn render_listing(&self, category: Option<&str>) -> String {
        let categories = match category {
            Some(name) => match Category::parse(name) {
                Some(cat) if self.categories().contains(&cat) => vec![cat],
                _ => {
                    let available: Vec<&str> =
                        self.categories().iter().map(|c| c.as_str()).collect();
                    return format!(
                        "No modules found for category '{}'. Available categories: {}",
                        name,
                        available.join(", ")
                    );
                }
            },
            None => self.categories(),
        };

        let mut lines = vec!["# Available Azure Verified Modules".to_string()];
        for cat in categories {
            lines.push(String::new());
            lines.push(format!("## {}", cat.title()));
            let mut entries: Vec<&CatalogEntry> =
                self.entries.iter().filter(|e| e.category == cat).collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let aliases = if entry.aliases.is_empty() {
                    "none".to_string()
                } else {
                    entry
                        .aliases
                        .iter()
                        .take(3)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                lines.push(format!("- **{}**: {}", entry.name, entry.description));
                lines.push(format!("  - Source: `{}`", entry.source));
                lines.push(format!("  - Aliases: {}", aliases));
            }
        }
        lines.join("\n")
    }

    /// Detailed markdown report for one module, or a not-found message with
    /// search suggestions.
    pub fn render_info(&self, identifier: &str) -> String {
        let Some(entry) = self.lookup(identifier) else {
            let similar: Vec<&str> = self
                .search(identifier)
                .iter()
                .take(5)
                .map(|e| e.name.as_str())
                .collect();
            if similar.is_empty() {
                return format!("Module '{}' not found.", identifier);
            }
            return format!(
                "Module '{}' not found. Similar modules: {}",
                identifier,
                similar.join(", ")
            );
        };

        let mut lines = vec![
            format!("# {}", entry.name),
            String::new(),
            format!("**Description**: {}", entry.description),
            String::new(),
            "## Module Details".to_string(),
            format!("- **Source**: `{}`", entry.source),
            format!("- **Version**: `{}`", entry.version),
            format!("- **Category**: {}", entry.category),
        ];
        if !entry.resource_type.is_empty() {
            lines.push(format!("- **Resource Type**: `{}`", entry.resource_type));
        }
        if !entry.aliases.is_empty() {
            lines.push(format!("- **Aliases**: {}", entry.aliases.join(", ")));
        }
        if !entry.dependencies.is_empty() {
            lines.push(format!("- **Dependencies**: {}", entry.dependencies.join(", ")));
        }
        if !entry.outputs.is_empty() {
            lines.push(String::new());
            lines.push("## Outputs".to_string());
            lines.extend(entry.outputs.iter().map(|o| format!("- `{}`", o)));
        }

        lines.push(String::new());
        match &entry.example_usage {
            Some(example) => {
                lines.push("## Example Usage".to_string());
                lines.push("```hcl".to_string());
                lines.push(example.clone());
            }
            None => {
                lines.push("## Basic Usage".to_string());
                lines.push("```hcl".to_string());
                lines.push(format!("module \"{}\" {{", entry.name));
                lines.push(format!("  source  = \"{}\"", entry.source));
                lines.push(format!("  version = \"{}\"", entry.version_constraint()));
                for input in &entry.defaults {
                    lines.push(format!("  {} = {}", input.name, input.value));
                }
                lines.push("}".to_string());
            }
        }
        lines.push("```".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry::new(
            name,
            format!("Azure/avm-res-test-{}/azurerm", name.replace('_', "")),
            "0.1.0",
            Category::Compute,
            format!("Test module {}", name),
        )
    }

    #[test]
    fn test_builtin_catalog_satisfies_invariants() {
        let entries = Catalog::builtin().entries().to_vec();
        assert!(entries.len() >= 30);
        Catalog::new(entries).expect("builtin catalog must validate");
    }

    #[test]
    fn test_lookup_is_case_and_alias_insensitive() {
        let catalog = Catalog::builtin();
        let by_alias = catalog.lookup("VM").expect("alias");
        let by_name = catalog.lookup("virtual_machine").expect("name");
        assert_eq!(by_alias.name, by_name.name);
        assert_eq!(catalog.lookup("Virtual-Machine").map(|e| &e.name), Some(&by_name.name));
    }

    #[test]
    fn test_lookup_prefers_canonical_name_over_alias() {
        let a = entry("storage").with_aliases(&["blob"]);
        let b = entry("blob_store").with_aliases(&["storage"]);
        let catalog = Catalog::new(vec![b, a]).unwrap();
        assert_eq!(catalog.lookup("storage").unwrap().name, "storage");
    }

    #[test]
    fn test_lookup_is_exact_only() {
        let catalog = Catalog::builtin();
        assert!(catalog.lookup("virtual_mach").is_none());
        assert!(catalog.lookup("").is_none());
    }

    #[test]
    fn test_search_preserves_definition_order() {
        let catalog = Catalog::builtin();
        let results = catalog.search("network");
        assert!(!results.is_empty());
        let positions: Vec<usize> = results
            .iter()
            .map(|r| catalog.entries().iter().position(|e| e.name == r.name).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_list_by_unknown_category_is_empty() {
        let catalog = Catalog::builtin();
        assert!(catalog.list_by_category("quantum").is_empty());
        assert!(!catalog.list_by_category("Networking").is_empty());
    }

    #[test]
    fn test_new_rejects_bad_source() {
        let mut bad = entry("thing");
        bad.source = "hashicorp/thing/azurerm".to_string();
        let err = Catalog::new(vec![bad]).unwrap_err();
        assert!(err.to_string().contains("convention"));
    }

    #[test]
    fn test_new_rejects_unknown_dependency() {
        let e = entry("app").with_dependencies(&["missing"]);
        let err = Catalog::new(vec![e]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let err = Catalog::new(vec![entry("app"), entry("APP")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_version_constraint_is_pessimistic() {
        let e = Catalog::builtin().lookup("virtual_machine").unwrap();
        assert_eq!(e.version, "0.20.0");
        assert_eq!(e.version_constraint(), "~> 0.20");
    }

    #[test]
    fn test_render_info_not_found_suggests_similar() {
        let report = Catalog::builtin().render_info("postgres database server");
        assert!(report.contains("not found"));
    }

    #[test]
    fn test_render_listing_unknown_category() {
        let report = Catalog::builtin().render_listing(Some("quantum"));
        assert!(report.contains("Available categories"));
    }
}
