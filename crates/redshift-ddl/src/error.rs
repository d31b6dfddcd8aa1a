//! Error types for the schema planner.

use crate::descriptor::{ConstraintKind, LogicalType};

/// Errors that can occur while planning or executing schema changes.
///
/// The variants fall into two families. `NotSupported` is part of the
/// normal contract: callers are expected to catch it and route around the
/// missing engine feature. Everything else indicates a caller or schema
/// configuration problem and is not recoverable by retrying.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The operation has no safe translation on this engine.
    #[error("{0} is not supported on this database engine")]
    NotSupported(&'static str),

    /// A constraint lookup found an unexpected number of matches.
    #[error(
        "found {actual} {kind:?} constraint(s) for {table}.{columns:?}, expected exactly {expected}"
    )]
    AmbiguousConstraints {
        /// Table the lookup ran against.
        table: String,
        /// Column set the lookup ran against.
        columns: Vec<String>,
        /// Constraint kind that was searched for.
        kind: ConstraintKind,
        /// Number of constraints the operation requires.
        expected: usize,
        /// Number of constraints actually found.
        actual: usize,
    },

    /// A NOT NULL column was requested without any effective default.
    ///
    /// The engine rejects such a column on a populated table at the
    /// storage layer, so planning fails before any SQL is emitted.
    #[error("column '{column}' on table '{table}' is NOT NULL but has no default to populate existing rows")]
    MissingDefault {
        /// Table being altered.
        table: String,
        /// Column lacking a default.
        column: String,
    },

    /// No zero value is known for the column's logical type.
    ///
    /// Raised when a down-migration needs a synthesized default and the
    /// type has no sensible one.
    #[error("no zero value is known for type {logical_type:?} (column '{column}')")]
    UnknownTypeDefault {
        /// Column that needed the default.
        column: String,
        /// The unmapped logical type.
        logical_type: LogicalType,
    },

    /// A table definition declares more than one distribution key.
    #[error("table '{table}' declares more than one distribution key column")]
    MultipleDistributionKeys {
        /// The offending table.
        table: String,
    },

    /// The requested alteration has no supported sequencing on this engine.
    #[error("cannot alter column '{column}' on table '{table}': no supported alteration path")]
    UnsupportedAlter {
        /// Table being altered.
        table: String,
        /// Column being altered.
        column: String,
    },

    /// Database error surfaced by the execution primitive, passed
    /// through unwrapped.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for planner operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
