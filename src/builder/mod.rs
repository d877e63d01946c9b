//! Schema-checked statement builders
//!
//! [`QueryBuilder`] borrows a [`Schema`] and turns caller-supplied value maps
//! into statement ASTs. Each constructor returns a builder for one statement
//! kind, and each builder only exposes the follow-up operations that make
//! sense for that kind: `returning` on inserts, updates and deletes,
//! `filter`/`unique` on selects, `associate` on inserts.
//!
//! Builders are immutable. Every operation returns a new builder and leaves
//! the one it was called on untouched, so a partially built statement can be
//! reused as the base for several others.
//!
//! # Example
//!
//! ```rust,ignore
//! let sql = QueryBuilder::new(&schema);
//! let update = sql
//!     .update(
//!         "user",
//!         &value_map([("id", 1.into())]),
//!         &value_map([("data", "changed".into())]),
//!     )?
//!     .returning(&["id"])?;
//! assert_eq!(
//!     update.to_sql(),
//!     r#"update "user" set "data" = 'changed' where ("id") = ('1') returning "id""#
//! );
//! ```

mod associate;
mod insert;
mod select;
mod update;
mod with;

pub use insert::InsertBuilder;
pub use select::SelectBuilder;
pub use update::{DeleteBuilder, UpdateBuilder};
pub use with::insert_with;

// Convenience re-exports for building values
pub use crate::ast::{now, uuid};

use indexmap::IndexMap;

use crate::ast::{self, ColumnRef, Expr, FunctionCall, Ident, RenderOptions, Stmt};
use crate::error::{BuildError, BuildResult, UnsupportedOperation};
use crate::schema::{Schema, TableSchema};

/// A value supplied for one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// No value: `DEFAULT` in an insert, skipped in a SET list
    Absent,
    Text(String),
    /// Any other JSON value; rendered as its JSON text in a string literal
    Json(serde_json::Value),
    /// A function call inserted verbatim, e.g. [`uuid()`]
    Call(FunctionCall),
    /// A reference to another column, e.g. one returned by a CTE
    Column(ColumnRef),
}

impl ColumnValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Expression for a VALUES slot
    pub fn to_insert_expr(&self) -> Expr {
        self.to_operand().unwrap_or_else(Expr::default_value)
    }

    /// Expression for a SET list or WHERE comparison, `None` when absent
    pub fn to_operand(&self) -> Option<Expr> {
        match self {
            Self::Absent => None,
            Self::Text(s) => Some(Expr::string(s.as_str())),
            Self::Json(serde_json::Value::String(s)) => Some(Expr::string(s.as_str())),
            Self::Json(value) => Some(Expr::string(value.to_string())),
            Self::Call(call) => Some(Expr::FunctionCall(call.clone())),
            Self::Column(column) => Some(Expr::Column(column.clone())),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ColumnValue {
    fn from(n: i64) -> Self {
        Self::Json(n.into())
    }
}

impl From<i32> for ColumnValue {
    fn from(n: i32) -> Self {
        Self::Json(n.into())
    }
}

impl From<bool> for ColumnValue {
    fn from(b: bool) -> Self {
        Self::Json(b.into())
    }
}

impl From<serde_json::Value> for ColumnValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<FunctionCall> for ColumnValue {
    fn from(call: FunctionCall) -> Self {
        Self::Call(call)
    }
}

impl From<ColumnRef> for ColumnValue {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Column name → value, in the order the caller gave them
pub type ValueMap = IndexMap<String, ColumnValue>;

/// Association name → values of the row to insert on the other side
pub type AssociationMap = IndexMap<String, ValueMap>;

pub fn value_map<K: Into<String>>(entries: impl IntoIterator<Item = (K, ColumnValue)>) -> ValueMap {
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

pub fn association_map<K: Into<String>>(
    entries: impl IntoIterator<Item = (K, ValueMap)>,
) -> AssociationMap {
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// What every builder exposes: the statement built so far and the table it
/// targets
pub trait Statement: Sized {
    fn stmt(&self) -> &Stmt;

    /// Table the next `returning` applies to; also the alias the statement
    /// is bound under when chained with [`insert_with`]
    fn table(&self) -> &str;

    fn into_stmt(self) -> Stmt;

    /// Same builder, different statement
    fn replace_stmt(&self, stmt: Stmt) -> Self;

    fn to_sql(&self) -> String {
        ast::render(self.stmt())
    }

    fn to_sql_with(&self, options: RenderOptions) -> String {
        ast::render_with(self.stmt(), options)
    }

    /// Validate the statement shape before rendering
    fn try_to_sql(&self, options: RenderOptions) -> BuildResult<String> {
        ast::try_render(self.stmt(), options)
    }
}

macro_rules! impl_statement {
    ($builder:ident) => {
        impl<'s> $crate::builder::Statement for $builder<'s> {
            fn stmt(&self) -> &$crate::ast::Stmt {
                &self.stmt
            }

            fn table(&self) -> &str {
                &self.table
            }

            fn into_stmt(self) -> $crate::ast::Stmt {
                self.stmt
            }

            fn replace_stmt(&self, stmt: $crate::ast::Stmt) -> Self {
                Self {
                    schema: self.schema,
                    table: self.table.clone(),
                    stmt,
                }
            }
        }
    };
}
pub(crate) use impl_statement;

/// Entry point: constructors for every statement kind
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'s> {
    schema: &'s Schema,
}

impl<'s> QueryBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }
}

/// Look up `table` and check that every key of `values` is one of its columns
fn checked_table<'s>(
    schema: &'s Schema,
    table: &str,
    values: &ValueMap,
) -> BuildResult<&'s TableSchema> {
    let table_schema = schema.table(table)?;
    table_schema.ensure_columns(table, values.keys().map(String::as_str))?;
    Ok(table_schema)
}

/// `(column, operand)` pairs for a key or filter map; absent values are an
/// error since they cannot be compared
fn comparison_pairs(table: &str, values: &ValueMap) -> BuildResult<Vec<(Ident, Expr)>> {
    values
        .iter()
        .map(|(column, value)| {
            value
                .to_operand()
                .map(|expr| (Ident::new(column.as_str()), expr))
                .ok_or_else(|| {
                    BuildError::from(UnsupportedOperation::AbsentKeyValue {
                        table: table.to_string(),
                        column: column.clone(),
                    })
                })
        })
        .collect()
}

/// Select items for a list of column names
fn column_idents(columns: &[&str]) -> Vec<Ident> {
    columns.iter().map(|c| Ident::new(*c)).collect()
}
