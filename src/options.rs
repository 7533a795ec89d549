use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Knobs for one validation call.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    lookup_budget: usize,
    deadline_ms: Option<u64>,
}

impl ValidationOptions {
    /// Maximum number of DNS-consuming SPF terms in one resolution tree.
    pub const DEFAULT_LOOKUP_BUDGET: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup_budget(mut self, budget: usize) -> Self {
        self.lookup_budget = budget;
        self
    }

    /// Overall deadline measured from the start of the call. Lookups not
    /// started once it has passed are skipped.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn lookup_budget(&self) -> usize {
        self.lookup_budget
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            lookup_budget: Self::DEFAULT_LOOKUP_BUDGET,
            deadline_ms: None,
        }
    }
}
