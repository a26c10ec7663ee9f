//! Resolution of requested services into an ordered, deduplicated module list.
//!
//! Each appended entry is immediately followed by its transitive dependencies,
//! so dependencies always trail the module that required them and each
//! canonical name appears at most once.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry, Category};

/// Ordered, deduplicated catalog entries to generate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub entries: Vec<CatalogEntry>,
}

impl ResolvedRequest {
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A resolved request plus the identifiers that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved: ResolvedRequest,
    /// Unresolvable identifiers, in request order.
    pub unresolved: Vec<String>,
}

/// A description that missed exact lookup but matched through search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFallback {
    pub description: String,
    pub module: String,
}

/// Outcome of [`Resolver::recommend`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resolution: Resolution,
    pub fallbacks: Vec<SearchFallback>,
}

impl Recommendation {
    /// Markdown report grouped by category in deployment order.
    pub fn render(&self) -> String {
        let mut lines = vec!["# Recommended Azure Verified Modules".to_string(), String::new()];
        let entries = &self.resolution.resolved.entries;

        if entries.is_empty() {
            lines.push("No matching modules found.".to_string());
        }

        for category in Category::DEPLOYMENT_ORDER {
            let in_category: Vec<&CatalogEntry> =
                entries.iter().filter(|e| e.category == category).collect();
            if in_category.is_empty() {
                continue;
            }
            lines.push(format!("## {}", category.title()));
            for entry in in_category {
                lines.push(format!("- **{}** (`{}`)", entry.name, entry.source));
                lines.push(format!("  {}", entry.description));
                if let Some(fb) = self.fallbacks.iter().find(|f| f.module == entry.name) {
                    lines.push(format!("  - Matched from: \"{}\"", fb.description));
                }
            }
            lines.push(String::new());
        }

        if !self.resolution.unresolved.is_empty() {
            lines.push("## Not Found".to_string());
            for missing in &self.resolution.unresolved {
                lines.push(format!("- {}", missing));
            }
            lines.push(String::new());
        }

        lines.join("\n").trim_end().to_string()
    }
}

/// Resolves requested identifiers against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Resolve identifiers by exact lookup, expanding dependencies.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Resolution {
        let mut acc = Accumulator::default();
        let mut unresolved = Vec::new();

        for identifier in requested {
            let identifier = identifier.as_ref();
            match self.catalog.lookup(identifier) {
                Some(entry) => self.append(entry, &mut acc),
                None => {
                    debug!(identifier = %identifier, "unresolved service identifier");
                    unresolved.push(identifier.to_string());
                }
            }
        }

        Resolution {
            resolved: acc.into_request(),
            unresolved,
        }
    }

    /// Resolve free-form descriptions, falling back to the first search hit
    /// when exact lookup fails.
    pub fn recommend<S: AsRef<str>>(&self, descriptions: &[S]) -> Recommendation {
        let mut acc = Accumulator::default();
        let mut unresolved = Vec::new();
        let mut fallbacks = Vec::new();

        for description in descriptions {
            let description = description.as_ref();
            if let Some(entry) = self.catalog.lookup(description) {
                self.append(entry, &mut acc);
                continue;
            }
            match self.catalog.search(description).first() {
                Some(entry) => {
                    fallbacks.push(SearchFallback {
                        description: description.to_string(),
                        module: entry.name.clone(),
                    });
                    self.append(entry, &mut acc);
                }
                None => unresolved.push(description.to_string()),
            }
        }

        Recommendation {
            resolution: Resolution {
                resolved: acc.into_request(),
                unresolved,
            },
            fallbacks,
        }
    }

    fn append(&self, entry: &CatalogEntry, acc: &mut Accumulator) {
        if !acc.push(entry) {
            return;
        }
        for dep in &entry.dependencies {
            if let Some(dep_entry) = self.catalog.lookup(dep) {
                self.append(dep_entry, acc);
            }
        }
    }
}

#[derive(Default)]
struct Accumulator {
    seen: HashSet<String>,
    entries: Vec<CatalogEntry>,
}

impl Accumulator {
    /// Returns false when the canonical name is already present.
    fn push(&mut self, entry: &CatalogEntry) -> bool {
        if !self.seen.insert(entry.name.clone()) {
            return false;
        }
        self.entries.push(entry.clone());
        true
    }

    fn into_request(self) -> ResolvedRequest {
        ResolvedRequest {
            entries: self.entries,
        }
    }
}
