use std::collections::HashSet;
use std::time::Instant;

use crate::options::ValidationOptions;
use crate::report::{Diagnostics, ValidationResult};
use crate::resolver::normalize_domain;

/// State for one top-level validation call, threaded through every
/// recursive step. Never shared between calls.
#[derive(Debug)]
pub(crate) struct ValidationContext {
    pub(crate) diagnostics: Diagnostics,
    remaining: usize,
    exhausted: bool,
    visited: HashSet<String>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl ValidationContext {
    pub(crate) fn new(options: &ValidationOptions) -> Self {
        let deadline = options
            .deadline()
            .and_then(|limit| Instant::now().checked_add(limit));
        Self {
            diagnostics: Diagnostics::new(),
            remaining: options.lookup_budget(),
            exhausted: false,
            visited: HashSet::new(),
            deadline,
            timed_out: false,
        }
    }

    /// Reserve one lookup unit before a DNS-consuming step.
    ///
    /// Returns false when the step must be skipped: the deadline passed or
    /// the budget is spent. Each condition is reported once per call.
    pub(crate) fn begin_lookup(&mut self, term: &str) -> bool {
        if !self.within_deadline() {
            return false;
        }
        if self.exhausted {
            return false;
        }
        if self.remaining == 0 {
            self.exhausted = true;
            tracing::warn!(term, "lookup budget exhausted");
            self.diagnostics.critical(format!(
                "lookup budget exhausted at '{term}'; remaining DNS-consuming mechanisms were skipped"
            ));
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Deadline check for lookups that are not charged to the budget.
    pub(crate) fn within_deadline(&mut self) -> bool {
        if self.timed_out {
            return false;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.timed_out = true;
                tracing::warn!("validation deadline passed");
                self.diagnostics
                    .critical("validation timed out; remaining lookups were skipped");
                false
            }
            _ => true,
        }
    }

    /// Mark `domain` as being on the active resolution path. False if it
    /// already is (a cycle).
    pub(crate) fn enter(&mut self, domain: &str) -> bool {
        self.visited.insert(domain_key(domain))
    }

    pub(crate) fn leave(&mut self, domain: &str) {
        self.visited.remove(&domain_key(domain));
    }

    pub(crate) fn finish(self) -> ValidationResult {
        self.diagnostics.into_result()
    }
}

/// Comparison key for domains: the ASCII (IDNA) form, or the trimmed
/// lowercase text when the name cannot be converted.
pub(crate) fn domain_key(domain: &str) -> String {
    normalize_domain(domain)
        .unwrap_or_else(|_| domain.trim().trim_end_matches('.').to_ascii_lowercase())
}
