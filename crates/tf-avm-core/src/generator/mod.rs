//! Project generation: resolved modules to a two-file Terraform project.
//!
//! Output is deterministic: module blocks follow the resolved order exactly
//! and attribute alignment matches `terraform fmt`.

mod validate;

pub use validate::{validate_structure, StructureCheck};

use crate::catalog::CatalogEntry;
use crate::obs;
use crate::project::{GeneratedFile, ProjectOutput, PROVIDERS_FILE, ROOT_FILE};
use crate::resolver::ResolvedRequest;

/// Name of the foundational resource every module is wired to.
pub const RESOURCE_GROUP_REF: &str = "azurerm_resource_group.main";

const CLIENT_CONFIG_REF: &str = "data.azurerm_client_config.current";
const DEFAULT_LOCATION: &str = "eastus";
const TERRAFORM_VERSION: &str = ">= 1.9.0";
const AZURERM_VERSION: &str = "~> 4.0";

/// Lower-case, spaces and underscores folded to hyphens.
pub fn normalize_project_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '_'], "-")
}

/// Generates Terraform projects from resolved catalog entries.
#[derive(Debug, Clone)]
pub struct ProjectGenerator {
    default_location: String,
}

impl Default for ProjectGenerator {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_LOCATION.to_string(),
        }
    }
}

impl ProjectGenerator {
    pub fn new(default_location: impl Into<String>) -> Self {
        Self {
            default_location: default_location.into(),
        }
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    /// Generate `main.tf` and `providers.tf`, in that order.
    ///
    /// An empty request still yields both files, with only the resource
    /// group in the root file.
    pub fn generate(
        &self,
        resolved: &ResolvedRequest,
        project_name: &str,
        location: Option<&str>,
    ) -> ProjectOutput {
        let project = normalize_project_name(project_name);
        let location = location.unwrap_or(&self.default_location);

        let files = vec![
            GeneratedFile::new(ROOT_FILE, render_main(resolved, &project, location)),
            GeneratedFile::new(PROVIDERS_FILE, render_providers()),
        ];

        obs::emit_project_generated(&project, resolved.len(), files.len());
        ProjectOutput::new(files, render_summary(project_name, resolved))
    }
}

fn render_main(resolved: &ResolvedRequest, project: &str, location: &str) -> String {
    let mut out = Vec::new();
    out.push(format!("# Terraform configuration for {project}"));
    out.push(String::new());

    let needs_client_config = resolved
        .entries
        .iter()
        .flat_map(|e| &e.defaults)
        .any(|d| d.value.contains(CLIENT_CONFIG_REF));
    if needs_client_config {
        out.push("data \"azurerm_client_config\" \"current\" {}".to_string());
        out.push(String::new());
    }

    out.push("resource \"azurerm_resource_group\" \"main\" {".to_string());
    out.extend(aligned(
        &[
            ("name", quoted(&format!("rg-{project}"))),
            ("location", quoted(location)),
        ],
        1,
    ));
    out.push("}".to_string());

    for entry in &resolved.entries {
        out.push(String::new());
        out.extend(render_module(entry, resolved, project));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn render_module(entry: &CatalogEntry, resolved: &ResolvedRequest, project: &str) -> Vec<String> {
    let mut lines = vec![format!("module \"{}\" {{", entry.name)];
    lines.extend(aligned(
        &[
            ("source", quoted(&entry.source)),
            ("version", quoted(&entry.version_constraint())),
        ],
        1,
    ));
    lines.push(String::new());

    let mut inputs: Vec<(&str, String)> = vec![
        ("enable_telemetry", "true".to_string()),
        ("name", quoted(&instance_name(entry, project))),
        ("resource_group_name", format!("{RESOURCE_GROUP_REF}.name")),
        ("location", format!("{RESOURCE_GROUP_REF}.location")),
    ];
    inputs.extend(entry.defaults.iter().map(|d| (d.name.as_str(), d.value.clone())));
    lines.extend(aligned(&inputs, 1));
    lines.push(String::new());

    let mut depends_on = vec![RESOURCE_GROUP_REF.to_string()];
    depends_on.extend(
        entry
            .dependencies
            .iter()
            .filter(|dep| resolved.contains(dep))
            .map(|dep| format!("module.{dep}")),
    );
    lines.push(format!("  depends_on = [{}]", depends_on.join(", ")));
    lines.push("}".to_string());
    lines
}

/// Resource name honouring the global-uniqueness rules of the few services
/// that have them.
fn instance_name(entry: &CatalogEntry, project: &str) -> String {
    let alnum: String = project.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let alnum = if alnum.is_empty() { "avm".to_string() } else { alnum };

    match entry.name.as_str() {
        "storage_account" => truncate(&format!("{alnum}sa"), 24),
        "container_registry" => truncate(&format!("{alnum}cr"), 50),
        "key_vault" => {
            let base: String = project
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect();
            let base = base.trim_matches('-');
            let base = if base.is_empty() { "avm" } else { base };
            truncate(&format!("{base}-kv"), 24)
        }
        other => format!("{project}-{}", other.replace('_', "-")),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}

/// Attribute lines with `=` aligned the way `terraform fmt` aligns them.
fn aligned(attrs: &[(&str, String)], indent: usize) -> Vec<String> {
    let width = attrs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let pad = "  ".repeat(indent);
    attrs
        .iter()
        .map(|(k, v)| format!("{pad}{k:<width$} = {v}"))
        .collect()
}

fn render_providers() -> String {
    let lines = [
        "terraform {".to_string(),
        format!("  required_version = \"{TERRAFORM_VERSION}\""),
        String::new(),
        "  required_providers {".to_string(),
        "    azurerm = {".to_string(),
        "      source  = \"hashicorp/azurerm\"".to_string(),
        format!("      version = \"{AZURERM_VERSION}\""),
        "    }".to_string(),
        "  }".to_string(),
        "}".to_string(),
        String::new(),
        "provider \"azurerm\" {".to_string(),
        "  features {".to_string(),
        "    key_vault {".to_string(),
        "      purge_soft_delete_on_destroy = false".to_string(),
        "    }".to_string(),
        "    resource_group {".to_string(),
        "      prevent_deletion_if_contains_resources = false".to_string(),
        "    }".to_string(),
        "  }".to_string(),
        String::new(),
        "  storage_use_azuread = true".to_string(),
        "}".to_string(),
    ];
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn render_summary(project_name: &str, resolved: &ResolvedRequest) -> String {
    let mut lines = vec![format!("Terraform project '{project_name}' generated.")];
    lines.push(String::new());
    lines.push(format!("Files: {ROOT_FILE}, {PROVIDERS_FILE}"));
    if resolved.is_empty() {
        lines.push("Modules: none (resource group only)".to_string());
    } else {
        lines.push("Modules:".to_string());
        for entry in &resolved.entries {
            lines.push(format!("  - {} ({} {})", entry.name, entry.source, entry.version));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::resolver::Resolver;

    fn generate(services: &[&str]) -> ProjectOutput {
        let resolution = Resolver::new(Catalog::builtin()).resolve(services);
        ProjectGenerator::default().generate(&resolution.resolved, "My Demo_App", None)
    }

    #[test]
    fn test_project_name_normalisation() {
        assert_eq!(normalize_project_name("My Demo_App"), "my-demo-app");
    }

    #[test]
    fn test_empty_request_yields_two_valid_files() {
        let output = generate(&[]);
        assert_eq!(output.files.len(), 2);
        assert_eq!(output.files[0].name, ROOT_FILE);
        assert_eq!(output.files[1].name, PROVIDERS_FILE);
        for file in &output.files {
            let check = validate_structure(&file.content);
            assert!(check.valid, "{}: {}", file.name, check.message);
        }
        let root = output.root().unwrap();
        assert!(root.content.contains("name     = \"rg-my-demo-app\""));
        assert!(!root.content.contains("module \""));
    }

    #[test]
    fn test_module_blocks_follow_resolved_order() {
        let output = generate(&["function_app"]);
        let root = &output.root().unwrap().content;
        let fa = root.find("module \"function_app\"").unwrap();
        let asp = root.find("module \"app_service_plan\"").unwrap();
        let sa = root.find("module \"storage_account\"").unwrap();
        assert!(fa < asp && asp < sa);
        assert!(root.contains(
            "depends_on = [azurerm_resource_group.main, module.app_service_plan, module.storage_account]"
        ));
        assert!(validate_structure(root).valid);
    }

    #[test]
    fn test_module_block_contents() {
        let output = generate(&["storage"]);
        let root = &output.root().unwrap().content;
        assert!(root.contains("source  = \"Azure/avm-res-storage-storageaccount/azurerm\""));
        assert!(root.contains("version = \"~> 0.5\""));
        assert!(root.contains("enable_telemetry         = true"));
        assert!(root.contains("name                     = \"mydemoappsa\""));
        assert!(root.contains("account_replication_type = \"LRS\""));
    }

    #[test]
    fn test_key_vault_emits_client_config_data_block() {
        let output = generate(&["key_vault"]);
        let root = &output.root().unwrap().content;
        assert!(root.contains("data \"azurerm_client_config\" \"current\" {}"));
        assert!(root.contains("\"my-demo-app-kv\""));
        let check = validate_structure(root);
        assert!(check.valid, "{}", check.message);
    }

    #[test]
    fn test_unique_names_are_capped() {
        let catalog = Catalog::builtin();
        let long = "a".repeat(60);
        let sa = instance_name(catalog.lookup("storage_account").unwrap(), &long);
        let acr = instance_name(catalog.lookup("container_registry").unwrap(), &long);
        let kv = instance_name(catalog.lookup("key_vault").unwrap(), &long);
        assert_eq!(sa.len(), 24);
        assert_eq!(acr.len(), 50);
        assert_eq!(kv.len(), 24);
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate(&["aks", "acr", "redis"]), generate(&["aks", "acr", "redis"]));
    }
}
