//! SQL statement types
//!
//! This module defines the top-level SQL statement types: SELECT, INSERT,
//! UPDATE, DELETE and the WITH wrapper that chains them.

use std::sync::Arc;

use super::cte::Cte;
use super::expr::{Expr, Ident};

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    With(WithStmt),
}

impl Stmt {
    /// Lower-case statement kind, used in error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::With(_) => "with",
        }
    }

    /// The statement a WITH chain finally runs, or `self` when not wrapped
    pub fn innermost(&self) -> &Stmt {
        match self {
            Self::With(with) => with.body.innermost(),
            other => other,
        }
    }

    /// Whether running the statement writes rows, anywhere in a WITH chain
    pub fn is_data_modifying(&self) -> bool {
        match self {
            Self::Select(_) => false,
            Self::Insert(_) | Self::Update(_) | Self::Delete(_) => true,
            Self::With(s) => {
                s.bindings.iter().any(|cte| cte.query.is_data_modifying())
                    || s.body.is_data_modifying()
            }
        }
    }

    /// Whether the statement hands rows back to the caller
    pub fn returns_rows(&self) -> bool {
        match self {
            Self::Select(_) => true,
            Self::Insert(s) => !s.returning.is_empty(),
            Self::Update(s) => !s.returning.is_empty(),
            Self::Delete(s) => !s.returning.is_empty(),
            Self::With(s) => s.body.returns_rows(),
        }
    }
}

impl From<SelectStmt> for Stmt {
    fn from(stmt: SelectStmt) -> Self {
        Self::Select(stmt)
    }
}

impl From<InsertStmt> for Stmt {
    fn from(stmt: InsertStmt) -> Self {
        Self::Insert(stmt)
    }
}

impl From<UpdateStmt> for Stmt {
    fn from(stmt: UpdateStmt) -> Self {
        Self::Update(stmt)
    }
}

impl From<DeleteStmt> for Stmt {
    fn from(stmt: DeleteStmt) -> Self {
        Self::Delete(stmt)
    }
}

impl From<WithStmt> for Stmt {
    fn from(stmt: WithStmt) -> Self {
        Self::With(stmt)
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    /// SELECT columns
    pub columns: Vec<SelectColumn>,
    /// FROM clause
    pub from: Option<FromClause>,
    /// WHERE clause
    pub where_clause: Option<Expr>,
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simple SELECT with columns
    pub fn columns(columns: Vec<SelectColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: FromClause) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_where(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }
}

/// A column in a SELECT or RETURNING list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// An expression with optional alias: expr AS alias
    Expr { expr: Expr, alias: Option<Ident> },
    /// All columns: *
    Star,
}

impl SelectColumn {
    /// Create an expression column without alias
    pub fn expr(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }

    /// Create an expression column with alias
    pub fn expr_as(expr: Expr, alias: impl Into<Ident>) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// A bare column name
    pub fn column(name: impl Into<Ident>) -> Self {
        Self::expr(Expr::column(name))
    }

    pub fn star() -> Self {
        Self::Star
    }
}

/// FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    /// Simple table reference
    Table {
        schema: Option<Ident>,
        name: Ident,
        alias: Option<Ident>,
    },
    /// CROSS JOIN
    CrossJoin {
        left: Box<FromClause>,
        right: Box<FromClause>,
    },
}

impl FromClause {
    /// Create a simple table reference
    pub fn table(name: impl Into<Ident>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Create a table reference qualified by an optional schema
    pub fn qualified_table(schema: Option<Ident>, name: impl Into<Ident>) -> Self {
        Self::Table {
            schema,
            name: name.into(),
            alias: None,
        }
    }

    /// Add an alias to this FROM clause
    pub fn with_alias(self, alias: impl Into<Ident>) -> Self {
        match self {
            Self::Table { schema, name, .. } => Self::Table {
                schema,
                name,
                alias: Some(alias.into()),
            },
            _ => self,
        }
    }

    /// Create a CROSS JOIN
    pub fn cross_join(self, right: FromClause) -> Self {
        Self::CrossJoin {
            left: Box::new(self),
            right: Box::new(right),
        }
    }
}

/// `column = value` pair of an UPDATE or ON CONFLICT DO UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAssignment {
    pub column: Ident,
    pub value: Expr,
}

impl ColumnAssignment {
    pub fn new(column: impl Into<Ident>, value: Expr) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    /// Target schema
    pub schema: Option<Ident>,
    /// Target table
    pub table: Ident,
    /// Target columns
    pub columns: Vec<Ident>,
    /// Values to insert
    pub values: InsertValues,
    /// ON CONFLICT clause (for upserts)
    pub on_conflict: Option<OnConflict>,
    /// RETURNING clause
    pub returning: Vec<SelectColumn>,
}

impl InsertStmt {
    pub fn new(table: impl Into<Ident>, columns: Vec<Ident>, values: InsertValues) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns,
            values,
            on_conflict: None,
            returning: vec![],
        }
    }

    pub fn with_schema(mut self, schema: Option<Ident>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_returning(mut self, returning: Vec<SelectColumn>) -> Self {
        self.returning = returning;
        self
    }

    pub fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }
}

/// Values for INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValues {
    /// VALUES (row1), (row2), ...
    Values(Vec<Vec<Expr>>),
    /// INSERT ... SELECT ...
    Query(Box<SelectStmt>),
    /// DEFAULT VALUES, for a row where every column takes its default
    DefaultValues,
}

/// ON CONFLICT clause for upserts
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    pub target: Option<OnConflictTarget>,
    pub action: OnConflictAction,
}

/// Target for ON CONFLICT
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflictTarget {
    /// ON CONFLICT (column1, column2)
    Columns(Vec<Ident>),
}

/// Action for ON CONFLICT
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflictAction {
    /// DO NOTHING
    DoNothing,
    /// DO UPDATE SET ...
    DoUpdate { sets: Vec<ColumnAssignment> },
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    /// Target schema
    pub schema: Option<Ident>,
    /// Target table
    pub table: Ident,
    /// SET clause
    pub sets: Vec<ColumnAssignment>,
    /// WHERE clause, always present
    pub where_clause: Expr,
    /// RETURNING clause
    pub returning: Vec<SelectColumn>,
}

impl UpdateStmt {
    pub fn new(table: impl Into<Ident>, sets: Vec<ColumnAssignment>, where_clause: Expr) -> Self {
        Self {
            schema: None,
            table: table.into(),
            sets,
            where_clause,
            returning: vec![],
        }
    }

    pub fn with_schema(mut self, schema: Option<Ident>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_returning(mut self, returning: Vec<SelectColumn>) -> Self {
        self.returning = returning;
        self
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    /// Target schema
    pub schema: Option<Ident>,
    /// Target table
    pub table: Ident,
    /// WHERE clause, always present
    pub where_clause: Expr,
    /// RETURNING clause
    pub returning: Vec<SelectColumn>,
}

impl DeleteStmt {
    pub fn new(table: impl Into<Ident>, where_clause: Expr) -> Self {
        Self {
            schema: None,
            table: table.into(),
            where_clause,
            returning: vec![],
        }
    }

    pub fn with_schema(mut self, schema: Option<Ident>) -> Self {
        self.schema = schema;
        self
    }
}

/// WITH statement: an ordered chain of CTEs followed by the statement that
/// consumes them
///
/// Binding order is significant; a CTE may only reference aliases bound
/// before it.
#[derive(Debug, Clone, PartialEq)]
pub struct WithStmt {
    pub bindings: Vec<Cte>,
    pub body: Arc<Stmt>,
}

impl WithStmt {
    pub fn new(bindings: Vec<Cte>, body: impl Into<Arc<Stmt>>) -> Self {
        Self {
            bindings,
            body: body.into(),
        }
    }

    /// Aliases in binding order
    pub fn aliases(&self) -> impl Iterator<Item = &Ident> {
        self.bindings.iter().map(|cte| &cte.alias)
    }
}
