//! Text to tree parsing.

use questpack_core::RawValue;
use tracing::debug;

use crate::error::ParseError;

/// Turns pack text into a [`RawValue`] whose root is a compound.
pub trait TreeParser {
    /// # Errors
    ///
    /// Returns [`ParseError::Syntax`] for malformed text and
    /// [`ParseError::NotACompound`] when the root is not an object.
    fn parse_root_compound(&self, text: &str) -> Result<RawValue, ParseError>;
}

/// JSON pack parser.
///
/// # Examples
///
/// ```
/// use questpack_import::{JsonTreeParser, ParseError, TreeParser};
///
/// let parser = JsonTreeParser;
/// let tree = parser.parse_root_compound(r#"{"id": "pack"}"#).unwrap();
/// assert_eq!(tree.get("id").and_then(|v| v.as_str()), Some("pack"));
///
/// assert_eq!(
///     parser.parse_root_compound("[1]"),
///     Err(ParseError::NotACompound { found: "list" })
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeParser;

impl TreeParser for JsonTreeParser {
    fn parse_root_compound(&self, text: &str) -> Result<RawValue, ParseError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            debug!(line = e.line(), column = e.column(), error = %e, "pack text is not valid JSON");
            ParseError::Syntax {
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            }
        })?;

        let tree = RawValue::from(value);
        if tree.as_compound().is_none() {
            return Err(ParseError::NotACompound {
                found: tree.kind_name(),
            });
        }
        Ok(tree)
    }
}
