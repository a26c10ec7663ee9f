use std::collections::HashSet;

use tf_avm_core::dataset::ARCHITECTURE_PATTERNS;
use tf_avm_core::{read_jsonl, write_jsonl, Catalog, TrainingDataset};

#[test]
fn export_writes_patterns_then_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("train.jsonl");
    let dataset = TrainingDataset::new(Catalog::builtin());

    let written = dataset.write_jsonl(&path).unwrap();
    assert_eq!(written, dataset.examples().len());

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), written);

    let examples = read_jsonl(&path).unwrap();
    assert_eq!(examples, dataset.examples());

    let pattern_count: usize = ARCHITECTURE_PATTERNS.iter().map(|p| p.prompts.len()).sum();
    assert!(examples[..pattern_count]
        .iter()
        .all(|e| !e.task_id.starts_with("lookup_")));
    assert!(examples[pattern_count..]
        .iter()
        .all(|e| e.task_id.starts_with("lookup_")));
}

#[test]
fn task_ids_are_unique() {
    let examples = TrainingDataset::new(Catalog::builtin()).examples();
    let ids: HashSet<&str> = examples.iter().map(|e| e.task_id.as_str()).collect();
    assert_eq!(ids.len(), examples.len());
}

#[test]
fn every_expected_module_is_a_catalog_entry() {
    let catalog = Catalog::builtin();
    for example in TrainingDataset::new(catalog).examples() {
        for module in &example.expected_modules {
            assert!(
                catalog.entries().iter().any(|e| &e.name == module),
                "{}: {module} is not a catalog entry",
                example.task_id
            );
        }
    }
}

#[test]
fn reader_skips_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.jsonl");
    let examples = TrainingDataset::new(Catalog::builtin()).pattern_examples();
    write_jsonl(&path, &examples[..2]).unwrap();

    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("\n   \n");
    std::fs::write(&path, text).unwrap();

    assert_eq!(read_jsonl(&path).unwrap().len(), 2);
}

#[test]
fn malformed_line_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.jsonl");
    std::fs::write(&path, "{\"task_id\": 1}\n").unwrap();
    assert!(read_jsonl(&path).is_err());
}
