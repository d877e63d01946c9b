//! SQL Abstract Syntax Tree (AST) module
//!
//! This module provides a type-safe representation of SQL statements that can
//! be constructed programmatically, rewritten without mutation, and rendered
//! to SQL strings.
//!
//! # Architecture
//!
//! - [`expr`]: SQL expressions (columns, literals, operators, function calls)
//! - [`stmt`]: SQL statements (SELECT, INSERT, UPDATE, DELETE, WITH)
//! - [`cte`]: Common Table Expression bindings
//! - [`rewrite`]: pure rewrites that return a new statement
//! - [`render`]: SQL string generation
//!
//! # Example
//!
//! ```rust,ignore
//! use pasta_sql::ast::*;
//!
//! let stmt = SelectStmt::columns(vec![SelectColumn::column("id")])
//!     .with_from(FromClause::table("users"))
//!     .with_where(Expr::column("id").eq(Expr::string("1")));
//!
//! let sql = render(&Stmt::Select(stmt));
//! // select "id" from "users" where "id" = '1'
//! ```

mod cte;
mod expr;
mod render;
pub mod rewrite;
mod stmt;

// Re-export all public types
pub use cte::*;
pub use expr::*;
pub use render::*;
pub use stmt::*;

#[cfg(test)]
mod tests;
