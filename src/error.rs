//! Error types
//!
//! Everything in the crate that can fail returns [`BuildResult`]. Errors are
//! raised at the call that introduced the problem; nothing is deferred to
//! render time.

use itertools::Itertools;
use thiserror::Error;

/// Result alias used by schema lookups, builders and rewrites
pub type BuildResult<T> = Result<T, BuildError>;

/// Top-level error for statement construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The schema registry does not describe what was asked for
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The requested combination of operations is not supported
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    /// The AST has a shape the renderer cannot turn into SQL
    #[error("render error: {0}")]
    Render(String),
}

impl BuildError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// True for errors caused by the schema registry
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// True for errors caused by an unsupported operation
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Schema registry lookup and validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("unknown column {column} on table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("unknown association {association} on table {table}")]
    UnknownAssociation { table: String, association: String },

    #[error("columns ({}) do not form a key of table {table}", .columns.iter().join(", "))]
    NotAKey { table: String, columns: Vec<String> },

    #[error("invalid schema: {0}")]
    Invalid(String),

    #[error("failed to parse schema: {0}")]
    Parse(String),
}

/// Operations that are rejected rather than silently producing bad SQL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedOperation {
    #[error("association {association} on table {table} has kind {kind}, only MxN can be expanded")]
    UnsupportedAssociationKind {
        table: String,
        association: String,
        kind: &'static str,
    },

    #[error("exactly one association per associate call is supported, got {count}")]
    AssociationFanOut { count: usize },

    #[error("association {association} on table {table} points back at its owner table")]
    SelfAssociation { table: String, association: String },

    #[error("alias {alias} is already bound in this WITH chain")]
    DuplicateAlias { alias: String },

    #[error("refusing to build a statement on {table} without key columns")]
    EmptyKeySet { table: String },

    #[error("update of {table} has no columns to set")]
    EmptySetList { table: String },

    #[error("key column {column} of {table} has no value")]
    AbsentKeyValue { table: String, column: String },

    #[error("{kind} statements have no RETURNING clause")]
    NoReturningTarget { kind: &'static str },

    #[error("{kind} statements cannot take an equality filter")]
    NoFilterTarget { kind: &'static str },

    #[error("{kind} statements cannot take an ON CONFLICT clause")]
    NoConflictTarget { kind: &'static str },
}

/// Failures at the execution boundary
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("executor failed: {0}")]
    Backend(String),

    #[error("statement {sql} did not return any rows")]
    NoRows { sql: String },
}

impl ExecutionError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
