//! Error types for parsing, reading, merging and configuration.
//!
//! Validation findings are never errors: they travel as
//! [`ValidationIssue`] lists. The enums below cover only the failures that
//! stop an import outright.

use questpack_core::{ModelError, ValidationIssue};
use thiserror::Error;

/// The pack text could not be turned into a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("expected an object at the document root but found {found}")]
    NotACompound { found: &'static str },
}

/// The tree could not be read as a pack at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    #[error("pack root must be an object but found {found}")]
    RootNotObject { found: &'static str },
}

/// The merge could not produce a consistent project.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Asset copying was requested without both roots.
    #[error("asset copying requires an asset {which} directory")]
    MissingAssetRoot { which: &'static str },

    /// The merged project violates a model invariant.
    #[error("merged project is invalid: {0}")]
    InvalidProject(#[from] ModelError),
}

/// Import configuration could not be loaded or saved.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of the end-to-end import pipeline.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Validation reported errors and the configuration does not allow them.
    #[error("pack has {error_count} validation error(s)")]
    Blocked {
        error_count: usize,
        issues: Vec<ValidationIssue>,
    },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}
