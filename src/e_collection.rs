//! Per-file diagnostic sink for presentation.
//!
//! Each sink is independent: a configure collection and a build collection
//! can be cleared separately.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::e_diagnostic::DiagnosticSeverity;
use crate::e_resolver::ResolvedDiagnostic;

#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    name: String,
    data: HashMap<PathBuf, Vec<ResolvedDiagnostic>>,
}

/// Owned, sorted copy of a collection: files with errors first, then by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    files: Vec<(PathBuf, Vec<ResolvedDiagnostic>)>,
}

impl CollectionSnapshot {
    pub fn files(&self) -> &[(PathBuf, Vec<ResolvedDiagnostic>)] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|d| d.diagnostic.classification() == Some(severity))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(DiagnosticSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(DiagnosticSeverity::Information)
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }
}

impl DiagnosticCollection {
    pub fn new(name: impl Into<String>) -> Self {
        DiagnosticCollection {
            name: name.into(),
            data: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Group by path and replace the entries of every file in the batch.
    /// Files not mentioned keep what they had.
    pub fn populate(&mut self, resolved: &[ResolvedDiagnostic]) {
        let mut grouped: HashMap<PathBuf, Vec<ResolvedDiagnostic>> = HashMap::new();
        for diag in resolved {
            grouped.entry(diag.path.clone()).or_default().push(diag.clone());
        }
        for (path, items) in grouped {
            log::trace!("[{}] {} diagnostic(s) for {}", self.name, items.len(), path.display());
            self.data.insert(path, items);
        }
    }

    pub fn get(&self, path: &Path) -> &[ResolvedDiagnostic] {
        self.data.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        let mut files: Vec<(PathBuf, Vec<ResolvedDiagnostic>)> = self
            .data
            .iter()
            .map(|(path, items)| (path.clone(), items.clone()))
            .collect();
        let has_errors = |items: &[ResolvedDiagnostic]| {
            items
                .iter()
                .any(|d| d.diagnostic.classification().is_some_and(|s| s.is_error()))
        };
        files.sort_by(|a, b| {
            has_errors(b.1.as_slice())
                .cmp(&has_errors(a.1.as_slice()))
                .then_with(|| a.0.cmp(&b.0))
        });
        CollectionSnapshot { files }
    }
}
