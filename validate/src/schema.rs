//! Composable structural schema.
//!
//! A [`SchemaNode`] describes the expected shape of one value in a
//! [`RawValue`] tree. Validation never stops early: every node appends its
//! findings to the caller's accumulator and returns, so a single pass reports
//! every problem in the document.
//!
//! # Example
//!
//! ```
//! use questpack_core::{RawValue, ROOT_PATH};
//! use questpack_validate::schema::{ObjectSchema, SchemaNode};
//!
//! let schema = SchemaNode::object(
//!     ObjectSchema::new()
//!         .required("id", SchemaNode::union(vec![SchemaNode::string(), SchemaNode::Number]))
//!         .optional("hidden", SchemaNode::Boolean),
//! );
//!
//! let mut issues = Vec::new();
//! schema.validate(&RawValue::from(serde_json::json!({"id": 3})), ROOT_PATH, &mut issues);
//! assert!(issues.is_empty());
//!
//! schema.validate(&RawValue::from(serde_json::json!({"hidden": "no"})), ROOT_PATH, &mut issues);
//! assert_eq!(issues.len(), 2);
//! ```

use indexmap::IndexMap;
use questpack_core::{PropertyMap, RawValue, ValidationIssue, error_count, field_path, index_path};
use regex::Regex;

/// One node of a structural schema.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// String scalar. Blank values are rejected unless `allow_blank` is set.
    String { allow_blank: bool },
    /// String scalar matching `regex`; `description` names the expected form.
    Pattern { regex: Regex, description: String },
    /// String whose lower-cased form is one of `allowed`.
    Enum { allowed: Vec<String> },
    Number,
    Boolean,
    Array(ArraySchema),
    Object(ObjectSchema),
    /// Ordered alternatives; see [`SchemaNode::validate`] for the selection rule.
    Union(Vec<SchemaNode>),
}

/// Element schema plus emptiness policy of a list.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub element: Box<SchemaNode>,
    pub allow_empty: bool,
}

/// Cross-field check evaluated after every property has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRule {
    /// At least one of the keys must be present, non-null and non-empty.
    RequireAnyOf(Vec<String>),
}

impl ObjectRule {
    fn check(&self, map: &PropertyMap, path: &str, issues: &mut Vec<ValidationIssue>) {
        match self {
            Self::RequireAnyOf(keys) => {
                let satisfied = keys.iter().any(|key| match map.get(key) {
                    None | Some(RawValue::Null) => false,
                    Some(RawValue::List(items)) => !items.is_empty(),
                    Some(RawValue::String(s)) => !s.trim().is_empty(),
                    Some(_) => true,
                });
                if !satisfied {
                    issues.push(ValidationIssue::error(
                        path,
                        format!("At least one of [{}] must be provided", keys.join(", ")),
                    ));
                }
            }
        }
    }
}

/// Known properties, required names, unknown-key policy and rules of a
/// compound value.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: IndexMap<String, SchemaNode>,
    required: Vec<String>,
    allow_unknown: bool,
    rules: Vec<ObjectRule>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property that must be present and non-null.
    pub fn required(mut self, name: &str, schema: SchemaNode) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.required.push(name.to_string());
        self
    }

    /// Declares a property that may be absent or null.
    pub fn optional(mut self, name: &str, schema: SchemaNode) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    /// Tolerates undeclared keys without a warning.
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    pub fn rule(mut self, rule: ObjectRule) -> Self {
        self.rules.push(rule);
        self
    }

    fn validate(&self, value: &RawValue, path: &str, issues: &mut Vec<ValidationIssue>) {
        let Some(map) = value.as_compound() else {
            issues.push(kind_mismatch("object", value, path));
            return;
        };

        for name in &self.required {
            match map.get(name) {
                None => issues.push(ValidationIssue::error(
                    field_path(path, name),
                    format!("Missing required property '{name}'"),
                )),
                Some(RawValue::Null) => issues.push(ValidationIssue::error(
                    field_path(path, name),
                    format!("Required property '{name}' cannot be null"),
                )),
                Some(_) => {}
            }
        }

        for (key, child) in map {
            let child_path = field_path(path, key);
            match self.properties.get(key) {
                // Null optionals are treated as absent; null required keys
                // were reported above.
                Some(_) if child.is_null() => {}
                Some(schema) => schema.validate(child, &child_path, issues),
                None if self.allow_unknown => {}
                None => issues.push(ValidationIssue::warning(
                    child_path,
                    format!("Unknown property '{key}'"),
                )),
            }
        }

        for rule in &self.rules {
            rule.check(map, path, issues);
        }
    }
}

impl SchemaNode {
    /// Non-blank string.
    pub fn string() -> Self {
        Self::String { allow_blank: false }
    }

    /// Any string, blank included.
    pub fn text() -> Self {
        Self::String { allow_blank: true }
    }

    /// String matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid pattern.
    pub fn pattern(pattern: &str, description: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            description: description.to_string(),
        })
    }

    /// Case-insensitive string enumeration.
    pub fn enumeration<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Enum {
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// List of `element`, empty allowed.
    pub fn array(element: SchemaNode) -> Self {
        Self::Array(ArraySchema {
            element: Box::new(element),
            allow_empty: true,
        })
    }

    /// List of `element` with at least one entry.
    pub fn non_empty_array(element: SchemaNode) -> Self {
        Self::Array(ArraySchema {
            element: Box::new(element),
            allow_empty: false,
        })
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::Object(schema)
    }

    pub fn union(candidates: Vec<SchemaNode>) -> Self {
        Self::Union(candidates)
    }

    /// Validates `value` located at `path`, appending findings to `issues`.
    ///
    /// A union tries its candidates in order. The first candidate reporting
    /// no ERROR wins and its issues, warnings included, are adopted verbatim.
    /// When every candidate fails, the issues of the candidate with the
    /// fewest ERRORs are adopted, ties going to the earlier candidate.
    ///
    /// # Examples
    ///
    /// ```
    /// use questpack_core::RawValue;
    /// use questpack_validate::schema::SchemaNode;
    ///
    /// let id = SchemaNode::union(vec![SchemaNode::string(), SchemaNode::Number]);
    /// let mut issues = Vec::new();
    /// id.validate(&RawValue::Bool(true), "$.id", &mut issues);
    ///
    /// assert_eq!(issues.len(), 1);
    /// assert_eq!(issues[0].message, "Expected string but found boolean");
    /// ```
    pub fn validate(&self, value: &RawValue, path: &str, issues: &mut Vec<ValidationIssue>) {
        match self {
            Self::String { allow_blank } => match value {
                RawValue::String(s) if !allow_blank && s.trim().is_empty() => {
                    issues.push(ValidationIssue::error(path, "Value cannot be blank"));
                }
                RawValue::String(_) => {}
                other => issues.push(kind_mismatch("string", other, path)),
            },
            Self::Pattern { regex, description } => match value {
                RawValue::String(s) if regex.is_match(s) => {}
                RawValue::String(s) => issues.push(ValidationIssue::error(
                    path,
                    format!("Value '{s}' does not match {description}"),
                )),
                other => issues.push(kind_mismatch("string", other, path)),
            },
            Self::Enum { allowed } => match value {
                RawValue::String(s) if allowed.contains(&s.to_lowercase()) => {}
                RawValue::String(s) => issues.push(ValidationIssue::error(
                    path,
                    format!("Value '{s}' must be one of: {}", allowed.join(", ")),
                )),
                other => issues.push(kind_mismatch("string", other, path)),
            },
            Self::Number => {
                if !value.is_number() {
                    issues.push(kind_mismatch("number", value, path));
                }
            }
            Self::Boolean => {
                if value.as_bool().is_none() {
                    issues.push(kind_mismatch("boolean", value, path));
                }
            }
            Self::Array(array) => {
                let Some(items) = value.as_list() else {
                    issues.push(kind_mismatch("list", value, path));
                    return;
                };
                if items.is_empty() && !array.allow_empty {
                    issues.push(ValidationIssue::error(path, "List cannot be empty"));
                }
                for (index, item) in items.iter().enumerate() {
                    array.element.validate(item, &index_path(path, index), issues);
                }
            }
            Self::Object(object) => object.validate(value, path, issues),
            Self::Union(candidates) => validate_union(candidates, value, path, issues),
        }
    }
}

fn validate_union(
    candidates: &[SchemaNode],
    value: &RawValue,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut best: Option<(usize, Vec<ValidationIssue>)> = None;
    for candidate in candidates {
        let mut attempt = Vec::new();
        candidate.validate(value, path, &mut attempt);
        let errors = error_count(&attempt);
        if errors == 0 {
            issues.extend(attempt);
            return;
        }
        if best.as_ref().is_none_or(|(fewest, _)| errors < *fewest) {
            best = Some((errors, attempt));
        }
    }

    match best {
        Some((_, attempt)) => issues.extend(attempt),
        None => issues.push(ValidationIssue::error(
            path,
            "Value does not match any allowed schema",
        )),
    }
}

fn kind_mismatch(expected: &str, value: &RawValue, path: &str) -> ValidationIssue {
    ValidationIssue::error(
        path,
        format!("Expected {expected} but found {}", value.kind_name()),
    )
}
