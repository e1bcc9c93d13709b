//! Constructor validation errors for project value objects.

use thiserror::Error;

/// Invariant violations detected when building project values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// An identifier is empty or whitespace-only.
    #[error("{entity} id cannot be blank")]
    BlankId { entity: &'static str },

    /// A required text field is empty or whitespace-only.
    #[error("{entity} '{id}' has a blank {field}")]
    BlankField {
        entity: &'static str,
        id: String,
        field: &'static str,
    },

    /// A numeric field is out of range.
    #[error("{entity} {field} is invalid: {reason}")]
    InvalidAmount {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },

    /// Two values in the same scope share an id.
    #[error("duplicate {entity} id: {id}")]
    DuplicateId { entity: &'static str, id: String },

    /// A value references an id that does not exist.
    #[error("{entity} '{owner}' references unknown {target} '{id}'")]
    UnknownReference {
        entity: &'static str,
        owner: String,
        target: &'static str,
        id: String,
    },

    /// A quest lists itself as a dependency.
    #[error("quest '{0}' cannot depend on itself")]
    SelfDependency(String),

    /// Two fields that exclude each other are both set.
    #[error("{entity} cannot set both {first} and {second}")]
    MutuallyExclusive {
        entity: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// No factory is registered for a task or reward discriminator.
    #[error("unknown {category} type: {kind}")]
    UnknownKind {
        category: &'static str,
        kind: String,
    },

    /// A task or reward property required by its kind is absent.
    #[error("{kind} is missing required property '{property}'")]
    MissingProperty {
        kind: String,
        property: &'static str,
    },

    /// A task or reward property has the wrong shape.
    #[error("{kind} property '{property}' must be {expected}")]
    InvalidProperty {
        kind: String,
        property: &'static str,
        expected: &'static str,
    },
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;
