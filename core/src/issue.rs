//! Validation findings shared by every validation pass.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Path of the document root.
pub const ROOT_PATH: &str = "$";

/// Severity of a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("ERROR"),
            Self::Warning => f.write_str("WARNING"),
        }
    }
}

/// A single finding, located by a `$`-rooted path such as
/// `$.chapters[2].quests[0].id`.
///
/// # Examples
///
/// ```
/// use questpack_core::{ValidationIssue, has_errors, index_path, field_path, ROOT_PATH};
///
/// let path = field_path(&index_path(&field_path(ROOT_PATH, "chapters"), 2), "id");
/// assert_eq!(path, "$.chapters[2].id");
///
/// let issues = vec![ValidationIssue::warning(&path, "Unknown property 'foo'")];
/// assert!(!has_errors(&issues));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

/// Path of a named child property.
pub fn field_path(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}

/// Path of a list element.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Returns `true` when any issue has [`Severity::Error`].
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

/// Number of [`Severity::Error`] issues.
pub fn error_count(issues: &[ValidationIssue]) -> usize {
    issues.iter().filter(|issue| issue.is_error()).count()
}

/// Drops exact duplicates, keeping the first occurrence of each issue.
pub fn dedupe_issues(issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.clone()))
        .collect()
}
