//! Generated project value type and on-disk writer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Root configuration file name.
pub const ROOT_FILE: &str = "main.tf";
/// Provider and version-constraints file name.
pub const PROVIDERS_FILE: &str = "providers.tf";
/// Extension of files that are structurally validated.
pub const CONFIG_EXTENSION: &str = ".tf";

const SELF_CORRECTED_MARKER: &str = "[Self-corrected]";

/// One named text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        self.name.ends_with(CONFIG_EXTENSION)
    }
}

/// A generated project. Never mutated in place; transformations return a new
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutput {
    pub files: Vec<GeneratedFile>,
    pub summary: String,
}

impl ProjectOutput {
    pub fn new(files: Vec<GeneratedFile>, summary: impl Into<String>) -> Self {
        Self {
            files,
            summary: summary.into(),
        }
    }

    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn root(&self) -> Option<&GeneratedFile> {
        self.file(ROOT_FILE)
    }

    pub fn config_files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.iter().filter(|f| f.is_config())
    }

    /// New output with the root file's content replaced. Other files pass
    /// through unchanged; a missing root file is appended.
    pub fn with_root_replaced(&self, code: &str) -> Self {
        let mut files = self.files.clone();
        match files.iter_mut().find(|f| f.name == ROOT_FILE) {
            Some(root) => root.content = code.to_string(),
            None => files.push(GeneratedFile::new(ROOT_FILE, code)),
        }

        let summary = if self.summary.contains(SELF_CORRECTED_MARKER) {
            self.summary.clone()
        } else {
            format!("{}\n\n{}", self.summary, SELF_CORRECTED_MARKER)
        };

        Self { files, summary }
    }
}

/// Files written and skipped by [`write_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Write every file of `output` under `dir`, creating it as needed.
///
/// Existing files are left untouched unless `overwrite` is set.
pub fn write_project(dir: &Path, output: &ProjectOutput, overwrite: bool) -> Result<WriteReport> {
    std::fs::create_dir_all(dir)?;
    let mut report = WriteReport::default();

    for file in &output.files {
        let path = dir.join(&file.name);
        if path.exists() && !overwrite {
            debug!(path = %path.display(), "skipping existing file");
            report.skipped.push(path);
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &file.content)?;
        report.written.push(path);
    }

    Ok(report)
}

/// Load the configuration files of a directory, root file first and the
/// rest by name. Subdirectories are not read.
pub fn read_project(dir: &Path) -> Result<ProjectOutput> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type()?.is_file() && name.ends_with(CONFIG_EXTENSION) {
            let content = std::fs::read_to_string(entry.path())?;
            files.push(GeneratedFile::new(name, content));
        }
    }
    files.sort_by(|a, b| (a.name != ROOT_FILE, &a.name).cmp(&(b.name != ROOT_FILE, &b.name)));
    Ok(ProjectOutput::new(
        files,
        format!("Loaded from {}", dir.display()),
    ))
}
