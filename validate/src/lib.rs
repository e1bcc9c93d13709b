//! Validation passes for quest pack trees.
//!
//! Two independent passes run over the same [`RawValue`]:
//!
//! - [`SchemaValidator`] checks shape against the structural pack schema.
//! - [`CrossReferenceValidator`] checks id uniqueness, reference resolution
//!   and kind-specific required fields.
//!
//! Neither pass stops at the first problem; both return every finding.
//!
//! # Example
//!
//! ```
//! use questpack_core::{RawValue, has_errors};
//! use questpack_validate::validate_pack_tree;
//!
//! let tree = RawValue::from(serde_json::json!({
//!     "id": "pack",
//!     "title": "Pack",
//!     "chapters": [{"id": "intro"}, {"id": "intro"}]
//! }));
//! let issues = validate_pack_tree(&tree);
//! assert!(has_errors(&issues));
//! ```

pub mod pack_schema;
pub mod schema;
pub mod xref;

use questpack_core::{RawValue, ValidationIssue, dedupe_issues};

pub use pack_schema::SchemaValidator;
pub use schema::{ArraySchema, ObjectRule, ObjectSchema, SchemaNode};
pub use xref::CrossReferenceValidator;

/// Runs the schema pass, then the cross-reference pass, and returns their
/// deduplicated concatenation.
pub fn validate_pack_tree(root: &RawValue) -> Vec<ValidationIssue> {
    let mut issues = SchemaValidator::new().validate(root);
    issues.extend(CrossReferenceValidator::new().validate(root));
    dedupe_issues(issues)
}
