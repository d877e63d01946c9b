//! Pure statement rewrites
//!
//! Each function takes a statement by reference and returns a new one with a
//! single field replaced. The input is never modified; WITH bindings and
//! bodies the rewrite does not touch are shared through their `Arc`s.
//!
//! Rewrites name the variants they apply to and fail with
//! [`UnsupportedOperation`] on the rest.

use std::sync::Arc;

use super::cte::Cte;
use super::expr::{conjunction, Expr, Ident};
use super::stmt::*;
use crate::error::{BuildResult, UnsupportedOperation};

/// Replace the RETURNING list
///
/// For a WITH chain the innermost body is rewritten, since RETURNING is only
/// meaningful on the statement that finally runs.
pub fn with_returning(stmt: &Stmt, columns: &[Ident]) -> BuildResult<Stmt> {
    let returning: Vec<SelectColumn> = columns
        .iter()
        .map(|c| SelectColumn::column(c.clone()))
        .collect();

    match stmt {
        Stmt::Insert(insert) => Ok(Stmt::Insert(InsertStmt {
            returning,
            ..insert.clone()
        })),
        Stmt::Update(update) => Ok(Stmt::Update(UpdateStmt {
            returning,
            ..update.clone()
        })),
        Stmt::Delete(delete) => Ok(Stmt::Delete(DeleteStmt {
            returning,
            ..delete.clone()
        })),
        Stmt::With(with) => rewrite_body(with, |body| with_returning(body, columns)),
        Stmt::Select(_) => Err(UnsupportedOperation::NoReturningTarget { kind: stmt.kind() }.into()),
    }
}

/// Replace the projected columns of a SELECT
pub fn with_projection(stmt: &Stmt, columns: &[Ident]) -> BuildResult<Stmt> {
    match stmt {
        Stmt::Select(select) => Ok(Stmt::Select(SelectStmt {
            columns: columns
                .iter()
                .map(|c| SelectColumn::column(c.clone()))
                .collect(),
            ..select.clone()
        })),
        _ => Err(UnsupportedOperation::NoReturningTarget { kind: stmt.kind() }.into()),
    }
}

/// Replace the WHERE clause of a SELECT
pub fn with_filter(stmt: &Stmt, filter: Expr) -> BuildResult<Stmt> {
    match stmt {
        Stmt::Select(select) => Ok(Stmt::Select(SelectStmt {
            where_clause: Some(filter),
            ..select.clone()
        })),
        _ => Err(UnsupportedOperation::NoFilterTarget { kind: stmt.kind() }.into()),
    }
}

/// Replace the ON CONFLICT clause of an INSERT (or of the INSERT a WITH
/// chain runs)
pub fn with_on_conflict(stmt: &Stmt, on_conflict: OnConflict) -> BuildResult<Stmt> {
    match stmt {
        Stmt::Insert(insert) => Ok(Stmt::Insert(InsertStmt {
            on_conflict: Some(on_conflict),
            ..insert.clone()
        })),
        Stmt::With(with) => rewrite_body(with, move |body| with_on_conflict(body, on_conflict)),
        _ => Err(UnsupportedOperation::NoConflictTarget { kind: stmt.kind() }.into()),
    }
}

/// Bind `context` under `alias` ahead of `target`
///
/// A target that is already a WITH keeps its bindings and body and gets the
/// new binding appended; anything else becomes the body of a new WITH. A
/// context that is itself a WITH is flattened: its bindings are lifted into
/// the outer chain and only its body is bound under `alias`, since a WITH
/// holding data-modifying statements must stay at the top level.
///
/// No dependency analysis happens here: callers bind in dependency order.
/// Fails with [`UnsupportedOperation::DuplicateAlias`] when the merged chain
/// would bind one alias twice.
pub fn insert_with(alias: impl Into<Ident>, context: &Stmt, target: &Stmt) -> BuildResult<Stmt> {
    let (mut bindings, body) = match target {
        Stmt::With(with) => (with.bindings.clone(), Arc::clone(&with.body)),
        other => (Vec::new(), Arc::new(other.clone())),
    };
    match context {
        Stmt::With(inner) => {
            bindings.extend(inner.bindings.iter().cloned());
            bindings.push(Cte::new(alias, Arc::clone(&inner.body)));
        }
        other => bindings.push(Cte::new(alias, other.clone())),
    }

    if let Some(alias) = duplicate_alias(&bindings) {
        return Err(UnsupportedOperation::DuplicateAlias {
            alias: alias.to_string(),
        }
        .into());
    }
    Ok(Stmt::With(WithStmt { bindings, body }))
}

/// First alias bound more than once, if any
pub fn duplicate_alias(bindings: &[Cte]) -> Option<&str> {
    bindings.iter().enumerate().find_map(|(i, cte)| {
        bindings[..i]
            .iter()
            .any(|earlier| earlier.alias == cte.alias)
            .then(|| cte.alias.as_str())
    })
}

/// Row comparison `(a, b) = ('1', '2')`, the shape SELECT filters use
///
/// Returns `None` when there is nothing to compare.
pub fn eq_list(pairs: Vec<(Ident, Expr)>) -> Option<Expr> {
    if pairs.is_empty() {
        return None;
    }
    let (columns, values): (Vec<Expr>, Vec<Expr>) = pairs
        .into_iter()
        .map(|(column, value)| (Expr::column(column), value))
        .unzip();
    Some(Expr::list(columns).eq(Expr::list(values)))
}

/// `(a) = ('1') and (b) = ('2')`, the shape UPDATE and DELETE keys use
///
/// Returns `None` when there is nothing to compare.
pub fn key_conjunction(pairs: Vec<(Ident, Expr)>) -> Option<Expr> {
    conjunction(
        pairs
            .into_iter()
            .map(|(column, value)| Expr::list(vec![Expr::column(column)]).eq(Expr::list(vec![value]))),
    )
}

fn rewrite_body(
    with: &WithStmt,
    rewrite: impl FnOnce(&Stmt) -> BuildResult<Stmt>,
) -> BuildResult<Stmt> {
    let body = rewrite(&with.body)?;
    Ok(Stmt::With(WithStmt {
        bindings: with.bindings.clone(),
        body: Arc::new(body),
    }))
}
