//! Composable applicability checks for resolver strategies.

use std::fmt;

use crate::fragment::{ComponentRef, Fragment};

type Check = Box<dyn Fn(&Fragment, Option<&ComponentRef>) -> bool + Send + Sync>;

/// An ordered list of labelled boolean checks, combined with a short-circuit AND.
#[derive(Default)]
pub struct Conditions {
    checks: Vec<(&'static str, Check)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check.
    pub fn with<F>(mut self, label: &'static str, check: F) -> Self
    where
        F: Fn(&Fragment, Option<&ComponentRef>) -> bool + Send + Sync + 'static,
    {
        self.checks.push((label, Box::new(check)));
        self
    }

    /// Evaluate all checks in order, stopping at the first that fails.
    ///
    /// An empty list never complies.
    pub fn evaluate(&self, fragment: &Fragment, hint: Option<&ComponentRef>) -> bool {
        if self.checks.is_empty() {
            return false;
        }

        for (label, check) in &self.checks {
            if !check(fragment, hint) {
                tracing::trace!(fragment = fragment.name(), condition = *label, "condition not met");
                return false;
            }
        }
        true
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.checks.iter().map(|(label, _)| *label).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl fmt::Debug for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}
