//! INSERT and UPSERT

use super::{checked_table, column_idents, QueryBuilder, ValueMap};
use crate::ast::{
    rewrite, ColumnAssignment, Ident, InsertStmt, InsertValues, OnConflict, OnConflictAction,
    OnConflictTarget, Stmt,
};
use crate::error::BuildResult;
use crate::schema::Schema;

/// An INSERT, possibly wrapped in the WITH chain `associate` produced
#[derive(Debug, Clone)]
pub struct InsertBuilder<'s> {
    pub(super) schema: &'s Schema,
    pub(super) table: String,
    pub(super) stmt: Stmt,
}

super::impl_statement!(InsertBuilder);

impl<'s> QueryBuilder<'s> {
    /// `insert into <table> (<keys>) values (<values>)`
    ///
    /// Columns follow the map's order. Absent values become `DEFAULT`; an
    /// empty map inserts `default values`.
    pub fn insert(&self, table: &str, values: &ValueMap) -> BuildResult<InsertBuilder<'s>> {
        let stmt = insert_stmt(self.schema, table, values)?;
        Ok(InsertBuilder {
            schema: self.schema,
            table: table.to_string(),
            stmt: Stmt::Insert(stmt),
        })
    }

    /// Insert, or update the existing row on a primary key conflict
    ///
    /// The conflict SET list comes from `update_values` when given, else from
    /// `insert_values`. Absent values are left out of it; when nothing is
    /// left the conflict action is `do nothing`.
    pub fn upsert(
        &self,
        table: &str,
        insert_values: &ValueMap,
        update_values: Option<&ValueMap>,
    ) -> BuildResult<InsertBuilder<'s>> {
        let conflict_values = update_values.unwrap_or(insert_values);
        let table_schema = checked_table(self.schema, table, conflict_values)?;

        let sets: Vec<ColumnAssignment> = conflict_values
            .iter()
            .filter_map(|(column, value)| {
                value
                    .to_operand()
                    .map(|expr| ColumnAssignment::new(column.as_str(), expr))
            })
            .collect();
        let action = if sets.is_empty() {
            OnConflictAction::DoNothing
        } else {
            OnConflictAction::DoUpdate { sets }
        };
        let on_conflict = OnConflict {
            target: Some(OnConflictTarget::Columns(
                table_schema.keys.iter().map(Ident::new).collect(),
            )),
            action,
        };

        let stmt = insert_stmt(self.schema, table, insert_values)?.with_on_conflict(on_conflict);
        Ok(InsertBuilder {
            schema: self.schema,
            table: table.to_string(),
            stmt: Stmt::Insert(stmt),
        })
    }
}

impl<'s> InsertBuilder<'s> {
    /// Replace the RETURNING list of the statement that finally runs
    ///
    /// Columns are checked against [`Statement::table`](super::Statement::table),
    /// which after `associate` is the associative table.
    pub fn returning(&self, columns: &[&str]) -> BuildResult<Self> {
        self.schema
            .table(&self.table)?
            .ensure_columns(&self.table, columns.iter().copied())?;
        let stmt = rewrite::with_returning(&self.stmt, &column_idents(columns))?;
        Ok(Self {
            schema: self.schema,
            table: self.table.clone(),
            stmt,
        })
    }
}

/// Schema-checked INSERT for one row of values
pub(super) fn insert_stmt(schema: &Schema, table: &str, values: &ValueMap) -> BuildResult<InsertStmt> {
    checked_table(schema, table, values)?;

    let source = if values.is_empty() {
        InsertValues::DefaultValues
    } else {
        InsertValues::Values(vec![values.values().map(|v| v.to_insert_expr()).collect()])
    };
    let columns = values.keys().map(Ident::new).collect();

    Ok(InsertStmt::new(table, columns, source).with_schema(schema.namespace_ident()))
}
