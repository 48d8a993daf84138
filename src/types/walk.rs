use std::fmt;

use super::diagnostics::Severity;

/// The graph walk a condition evaluation happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkOperation {
    Validate,
    Plan,
    PlanRefreshOnly,
    PlanDestroy,
    Apply,
}

impl WalkOperation {
    /// Severity for failed conditions during this walk. Refresh-only and
    /// destroy plans only warn.
    #[must_use]
    pub fn check_rule_severity(self) -> Severity {
        match self {
            WalkOperation::PlanRefreshOnly | WalkOperation::PlanDestroy => Severity::Warning,
            WalkOperation::Validate | WalkOperation::Plan | WalkOperation::Apply => Severity::Error,
        }
    }
}

impl fmt::Display for WalkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkOperation::Validate => write!(f, "validate"),
            WalkOperation::Plan => write!(f, "plan"),
            WalkOperation::PlanRefreshOnly => write!(f, "plan (refresh-only)"),
            WalkOperation::PlanDestroy => write!(f, "plan (destroy)"),
            WalkOperation::Apply => write!(f, "apply"),
        }
    }
}
