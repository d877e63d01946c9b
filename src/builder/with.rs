//! CTE chaining between builders

use super::Statement;
use crate::ast::rewrite;
use crate::error::BuildResult;

/// Bind `context` ahead of `target` under the context's table name
///
/// The result keeps the target's builder type and table, so `returning`
/// still applies to the statement that finally runs. Calls compose: a target
/// that is already a WITH chain gets the binding appended after its existing
/// ones, and a context that is a WITH chain (say, the result of `associate`)
/// has its bindings lifted in front of its own.
///
/// ```rust,ignore
/// let chained = insert_with(&owner, &join)?;
/// let chained = insert_with(&other, &chained)?; // bindings: owner, other
/// ```
pub fn insert_with<C: Statement, T: Statement>(context: &C, target: &T) -> BuildResult<T> {
    let stmt = rewrite::insert_with(context.table(), context.stmt(), target.stmt())?;
    Ok(target.replace_stmt(stmt))
}
