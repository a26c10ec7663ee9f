use std::collections::HashSet;

use proptest::prelude::*;
use tf_avm_core::{Catalog, Category, Resolver};

fn catalog_names() -> Vec<String> {
    Catalog::builtin()
        .entries()
        .iter()
        .map(|e| e.name.clone())
        .collect()
}

#[test]
fn lookup_is_case_insensitive_and_alias_equivalent() {
    let catalog = Catalog::builtin();
    let by_alias = catalog.lookup("VM").unwrap();
    let by_name = catalog.lookup("virtual_machine").unwrap();
    let shouted = catalog.lookup("VIRTUAL_MACHINE").unwrap();
    assert_eq!(by_alias.name, by_name.name);
    assert_eq!(shouted.name, by_name.name);
}

#[test]
fn function_app_trails_its_dependencies() {
    let resolution = Resolver::new(Catalog::builtin()).resolve(&["function_app"]);
    assert!(resolution.unresolved.is_empty());
    let names = resolution.resolved.names();
    assert_eq!(names[0], "function_app");
    assert!(names.contains(&"app_service_plan"));
    assert!(names.contains(&"storage_account"));
    assert_eq!(names.len(), 3);
}

#[test]
fn implied_dependency_is_not_duplicated() {
    let resolution =
        Resolver::new(Catalog::builtin()).resolve(&["storage", "function_app", "web_app"]);
    let names = resolution.resolved.names();
    assert_eq!(names[0], "storage_account");
    assert_eq!(
        names.iter().filter(|n| **n == "storage_account").count(),
        1
    );
    assert_eq!(
        names.iter().filter(|n| **n == "app_service_plan").count(),
        1
    );
}

#[test]
fn misses_do_not_stop_resolution() {
    let resolution =
        Resolver::new(Catalog::builtin()).resolve(&["quantum_computer", "key_vault", "mainframe"]);
    assert_eq!(resolution.resolved.names(), vec!["key_vault"]);
    assert_eq!(resolution.unresolved, vec!["quantum_computer", "mainframe"]);
}

#[test]
fn recommend_report_lists_missing_descriptions() {
    let recommendation =
        Resolver::new(Catalog::builtin()).recommend(&["kubernetes", "teleporter"]);
    assert!(recommendation.resolution.resolved.contains("kubernetes_cluster"));
    assert!(recommendation.resolution.resolved.contains("virtual_network"));
    let report = recommendation.render();
    assert!(report.starts_with("# Recommended Azure Verified Modules"));
    assert!(report.contains("teleporter"));
}

#[test]
fn every_category_lists_only_its_entries() {
    let catalog = Catalog::builtin();
    for category in Category::ALL {
        for entry in catalog.list_by_category(category.as_str()) {
            assert_eq!(entry.category, category);
        }
    }
    assert!(catalog.list_by_category("quantum").is_empty());
}

proptest! {
    #[test]
    fn resolve_never_duplicates(
        requested in proptest::sample::subsequence(catalog_names(), 0..=10)
    ) {
        let resolution = Resolver::new(Catalog::builtin()).resolve(&requested);
        let names = resolution.resolved.names();
        let unique: HashSet<&str> = names.iter().copied().collect();
        prop_assert_eq!(unique.len(), names.len());
        prop_assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn resolve_is_a_fixed_point(
        requested in proptest::sample::subsequence(catalog_names(), 0..=10)
    ) {
        let resolver = Resolver::new(Catalog::builtin());
        let first = resolver.resolve(&requested).resolved;
        let again = resolver.resolve(&first.names()).resolved;
        prop_assert_eq!(first.names(), again.names());
    }

    #[test]
    fn resolved_set_is_dependency_closed(
        requested in proptest::sample::subsequence(catalog_names(), 0..=10)
    ) {
        let resolved = Resolver::new(Catalog::builtin()).resolve(&requested).resolved;
        for entry in &resolved.entries {
            for dep in &entry.dependencies {
                prop_assert!(resolved.contains(dep), "{} missing dependency {}", entry.name, dep);
            }
        }
    }

    #[test]
    fn lookup_ignores_case(index in 0..Catalog::builtin().len(), upper in any::<bool>()) {
        let names = catalog_names();
        let name = &names[index];
        let query = if upper { name.to_uppercase() } else { name.clone() };
        let found = Catalog::builtin().lookup(&query).map(|e| e.name.clone());
        prop_assert_eq!(found.as_deref(), Some(name.as_str()));
    }
}
