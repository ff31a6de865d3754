//! Error types for dispatcher configuration and argument validation.
//!
//! Configuration problems surface as [`SetupError`] from
//! [`DispatcherBuilder::build`](crate::DispatcherBuilder::build) or
//! [`Pipeline::build`](crate::Pipeline::build) and are not meant to be
//! recovered from at runtime. Argument validation failures never escape a
//! dispatch as errors; they are collected into [`UsageError`] records and
//! reported through the dispatch outcome.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while assembling a dispatcher or pipeline.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Two stages in the same pipeline share an id.
    #[error("stage '{id}' is declared more than once")]
    DuplicateStage {
        /// The duplicated stage id.
        id: String,
    },

    /// A stage ordering constraint names an id that is not in the stage set.
    #[error("stage '{from}' references unknown stage '{id}'")]
    UnknownStage {
        /// The stage declaring the constraint.
        from: String,
        /// The missing stage id.
        id: String,
    },

    /// The stage dependency graph contains a cycle.
    #[error("circular dependency in stage graph involving '{id}'")]
    CircularDependency {
        /// A stage id on the detected cycle.
        id: String,
    },

    /// A usage reference names a type that is not in the registry.
    #[error("usage type '{type_name}' is not registered")]
    UnresolvedUsage {
        /// The missing usage type name.
        type_name: String,
    },

    /// A usage inheritance chain loops back on itself instead of
    /// terminating at the native sentinel.
    #[error("usage type '{type_name}' has a cyclic inheritance chain")]
    CyclicUsage {
        /// The usage type whose chain loops.
        type_name: String,
    },

    /// A rest-capture usage is followed by further positional usages.
    #[error("command '{command}': rest usage '{name}' must be the last argument")]
    RestNotLast {
        /// The command declaring the usage list.
        command: String,
        /// The display name of the offending rest usage.
        name: String,
    },

    /// A shorthand usage token opens a bracket it never closes.
    #[error("unclosed {kind} argument bracket in '{token}'")]
    UnclosedBracket {
        /// Human label for the bracket kind (`required` or `optional`).
        kind: &'static str,
        /// The offending shorthand token.
        token: String,
    },

    /// A command descriptor is structurally invalid.
    #[error("invalid command: {message}")]
    InvalidCommand {
        /// Description of the defect.
        message: String,
    },
}

impl SetupError {
    /// Creates a new `DuplicateStage` error.
    #[must_use]
    pub fn duplicate_stage(id: impl Into<String>) -> Self {
        Self::DuplicateStage { id: id.into() }
    }

    /// Creates a new `UnknownStage` error.
    #[must_use]
    pub fn unknown_stage(from: impl Into<String>, id: impl Into<String>) -> Self {
        Self::UnknownStage {
            from: from.into(),
            id: id.into(),
        }
    }

    /// Creates a new `CircularDependency` error.
    #[must_use]
    pub fn circular_dependency(id: impl Into<String>) -> Self {
        Self::CircularDependency { id: id.into() }
    }

    /// Creates a new `UnresolvedUsage` error.
    #[must_use]
    pub fn unresolved_usage(type_name: impl Into<String>) -> Self {
        Self::UnresolvedUsage {
            type_name: type_name.into(),
        }
    }

    /// Creates a new `CyclicUsage` error.
    #[must_use]
    pub fn cyclic_usage(type_name: impl Into<String>) -> Self {
        Self::CyclicUsage {
            type_name: type_name.into(),
        }
    }

    /// Creates a new `RestNotLast` error.
    #[must_use]
    pub fn rest_not_last(command: impl Into<String>, name: impl Into<String>) -> Self {
        Self::RestNotLast {
            command: command.into(),
            name: name.into(),
        }
    }

    /// Creates a new `InvalidCommand` error.
    #[must_use]
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }
}

/// A structured argument validation failure.
///
/// One record is produced per failing usage position. The dispatcher treats
/// any non-empty error list as total failure of the invocation; no handler
/// runs on partially parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageError {
    /// Display name of the failing argument.
    pub name: String,
    /// Usage type name of the failing argument.
    pub type_name: String,
    /// Human-readable message templated with the argument's display name.
    pub message: String,
}

impl UsageError {
    /// Creates a new usage error.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
