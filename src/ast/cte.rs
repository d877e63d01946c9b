//! Common Table Expression (CTE) support
//!
//! Data-modifying CTEs are how dependent inserts are sequenced inside a
//! single statement: a later CTE or the WITH body reads the rows an earlier
//! CTE returned through its alias.

use std::sync::Arc;

use super::expr::Ident;
use super::stmt::Stmt;

/// A binding in a WITH clause: `alias AS (query)`
///
/// The query is reference counted so that rewriting a WITH chain shares the
/// bindings it does not touch.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// Name other parts of the statement use to read the CTE's rows
    pub alias: Ident,
    /// The statement that defines the CTE
    pub query: Arc<Stmt>,
}

impl Cte {
    pub fn new(alias: impl Into<Ident>, query: impl Into<Arc<Stmt>>) -> Self {
        Self {
            alias: alias.into(),
            query: query.into(),
        }
    }
}
