//! Diagnostics produced by the SPF and DMARC validators.
//!
//! A validation run appends [`Issue`]s to a [`Diagnostics`] collector and
//! finishes with a [`ValidationResult`]. Any recorded issue, whatever its
//! severity, marks the record as invalid.

use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// How bad an [`Issue`] is. Ordered from least to most severe.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Feature present in the record that this crate does not check.
    Low,
    /// Legal but discouraged.
    Warning,
    /// Semantically wrong but still interpretable.
    Error,
    /// The record is unusable as published.
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Outcome of validating one record. `status` is true only when `issues` is empty.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub status: bool,
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    pub(crate) fn from_issues(issues: Vec<Issue>) -> Self {
        Self {
            status: issues.is_empty(),
            issues,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status
    }

    /// Highest severity recorded, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|issue| issue.severity).max()
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(move |issue| issue.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues_with(severity).count()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return f.write_str("ok");
        }
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Ordered, append-only issue collector shared by one validation run.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let issue = Issue::new(severity, message);
        tracing::trace!(severity = %issue.severity, message = %issue.message, "issue recorded");
        self.issues.push(issue);
    }

    pub(crate) fn critical(&mut self, message: impl Into<String>) {
        self.push(Severity::Critical, message);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub(crate) fn low(&mut self, message: impl Into<String>) {
        self.push(Severity::Low, message);
    }

    pub(crate) fn into_result(self) -> ValidationResult {
        ValidationResult::from_issues(self.issues)
    }
}
