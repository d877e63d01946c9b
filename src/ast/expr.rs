//! SQL expression types
//!
//! Expressions are the leaves of every statement: column references,
//! literals, function calls, binary operations and parenthesised lists.

/// A SQL identifier (table name, column name, CTE alias)
///
/// Identifiers hold the raw name and are never pre-quoted. Quoting is the
/// renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(pub String);

impl Ident {
    /// Create a new identifier from any string-like type
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&String> for Ident {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a column, optionally qualified with a table or CTE alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias (e.g., "user" in "user.id")
    pub table_alias: Option<Ident>,
    /// Column name
    pub column: Ident,
}

impl ColumnRef {
    pub fn new(column: impl Into<Ident>) -> Self {
        Self {
            table_alias: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self {
            table_alias: Some(table.into()),
            column: column.into(),
        }
    }
}

/// SQL literal values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Boolean true/false
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// String literal (will be properly quoted)
    String(String),
    /// SQL DEFAULT keyword (for INSERT statements)
    Default,
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    And,
    Or,
}

impl BinaryOperator {
    /// Get the SQL representation of this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq => 4,
        }
    }

    /// Whether the operator is a keyword (and so follows keyword casing)
    pub fn is_keyword(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Declared result type of a generated-value function call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    #[default]
    None,
    Uuid,
    Timestamp,
}

/// A function call expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name
    pub name: Ident,
    /// Positional arguments
    pub args: Vec<Expr>,
    /// What the call produces, when it stands in for a column value
    pub return_type: ReturnType,
}

impl FunctionCall {
    pub fn new(name: impl Into<Ident>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            return_type: ReturnType::None,
        }
    }

    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }
}

/// `gen_random_uuid()`, for uuid key columns generated in the database
pub fn uuid() -> FunctionCall {
    FunctionCall::new("gen_random_uuid", vec![]).with_return_type(ReturnType::Uuid)
}

/// `now()`, for timestamp columns
pub fn now() -> FunctionCall {
    FunctionCall::new("now", vec![]).with_return_type(ReturnType::Timestamp)
}

/// The main expression enum encompassing all SQL expression types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Column reference: table.column or just column
    Column(ColumnRef),

    /// Literal value
    Literal(Literal),

    /// Function call, rendered verbatim
    FunctionCall(FunctionCall),

    /// Binary operation: expr op expr
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Parenthesised list: (expr1, expr2, ...)
    List(Vec<Expr>),
}

impl Expr {
    /// Create a column reference
    pub fn column(name: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    /// Create a qualified column reference (table.column)
    pub fn qualified_column(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::qualified(table, column))
    }

    /// Create a boolean literal
    pub fn bool(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }

    /// Create an integer literal
    pub fn int(n: i64) -> Self {
        Self::Literal(Literal::Integer(n))
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Literal::String(s.into()))
    }

    /// The DEFAULT keyword
    pub fn default_value() -> Self {
        Self::Literal(Literal::Default)
    }

    /// Create a binary operation
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a function call
    pub fn function(name: impl Into<Ident>, args: Vec<Expr>) -> Self {
        Self::FunctionCall(FunctionCall::new(name, args))
    }

    /// Create a parenthesised list
    pub fn list(items: Vec<Expr>) -> Self {
        Self::List(items)
    }

    /// Combine with AND
    pub fn and(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::And, other)
    }

    /// Combine with OR
    pub fn or(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Or, other)
    }

    /// Check equality
    pub fn eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Eq, other)
    }

    /// True if this is a literal (not a reference or call)
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl From<FunctionCall> for Expr {
    fn from(call: FunctionCall) -> Self {
        Self::FunctionCall(call)
    }
}

impl From<ColumnRef> for Expr {
    fn from(col: ColumnRef) -> Self {
        Self::Column(col)
    }
}

/// Fold expressions left-to-right with AND
///
/// Returns `None` for an empty input.
pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(Expr::and)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref() {
        let col = ColumnRef::new("id");
        assert_eq!(col.column.as_str(), "id");
        assert!(col.table_alias.is_none());

        let col = ColumnRef::qualified("user", "id");
        assert_eq!(col.table_alias.unwrap().as_str(), "user");
        assert_eq!(col.column.as_str(), "id");
    }

    #[test]
    fn test_generators() {
        let call = uuid();
        assert_eq!(call.name.as_str(), "gen_random_uuid");
        assert_eq!(call.return_type, ReturnType::Uuid);
        assert!(call.args.is_empty());

        assert_eq!(now().return_type, ReturnType::Timestamp);
    }

    #[test]
    fn test_conjunction_folds_left() {
        let a = Expr::column("a").eq(Expr::string("1"));
        let b = Expr::column("b").eq(Expr::string("2"));
        let c = Expr::column("c").eq(Expr::string("3"));

        let folded = conjunction(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(folded, a.and(b).and(c));

        assert!(conjunction(Vec::new()).is_none());
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(BinaryOperator::Eq.precedence() > BinaryOperator::And.precedence());
        assert!(BinaryOperator::And.precedence() > BinaryOperator::Or.precedence());
    }
}
