//! UPDATE and DELETE by key

use super::{checked_table, column_idents, comparison_pairs, QueryBuilder, ValueMap};
use crate::ast::{rewrite, ColumnAssignment, DeleteStmt, Expr, Stmt, UpdateStmt};
use crate::error::{BuildResult, SchemaError, UnsupportedOperation};
use crate::schema::Schema;

#[derive(Debug, Clone)]
pub struct UpdateBuilder<'s> {
    pub(super) schema: &'s Schema,
    pub(super) table: String,
    pub(super) stmt: Stmt,
}

super::impl_statement!(UpdateBuilder);

#[derive(Debug, Clone)]
pub struct DeleteBuilder<'s> {
    pub(super) schema: &'s Schema,
    pub(super) table: String,
    pub(super) stmt: Stmt,
}

super::impl_statement!(DeleteBuilder);

impl<'s> QueryBuilder<'s> {
    /// `update <table> set ... where (k1) = ('v1') and (k2) = ('v2')`
    ///
    /// `keys` must name exactly the columns of one of the table's keys.
    /// Absent values in `sets` are skipped.
    pub fn update(
        &self,
        table: &str,
        keys: &ValueMap,
        sets: &ValueMap,
    ) -> BuildResult<UpdateBuilder<'s>> {
        let where_clause = key_filter(self.schema, table, keys)?;
        checked_table(self.schema, table, sets)?;

        let sets: Vec<ColumnAssignment> = sets
            .iter()
            .filter_map(|(column, value)| {
                value
                    .to_operand()
                    .map(|expr| ColumnAssignment::new(column.as_str(), expr))
            })
            .collect();
        if sets.is_empty() {
            return Err(UnsupportedOperation::EmptySetList {
                table: table.to_string(),
            }
            .into());
        }

        let stmt = UpdateStmt::new(table, sets, where_clause).with_schema(self.schema.namespace_ident());
        Ok(UpdateBuilder {
            schema: self.schema,
            table: table.to_string(),
            stmt: Stmt::Update(stmt),
        })
    }

    /// `delete from <table> where ...`, with the same key rules as
    /// [`update`](Self::update)
    pub fn delete(&self, table: &str, keys: &ValueMap) -> BuildResult<DeleteBuilder<'s>> {
        let where_clause = key_filter(self.schema, table, keys)?;
        let stmt = DeleteStmt::new(table, where_clause).with_schema(self.schema.namespace_ident());
        Ok(DeleteBuilder {
            schema: self.schema,
            table: table.to_string(),
            stmt: Stmt::Delete(stmt),
        })
    }
}

impl<'s> UpdateBuilder<'s> {
    pub fn returning(&self, columns: &[&str]) -> BuildResult<Self> {
        returning(self.schema, &self.table, &self.stmt, columns).map(|stmt| Self {
            schema: self.schema,
            table: self.table.clone(),
            stmt,
        })
    }
}

impl<'s> DeleteBuilder<'s> {
    pub fn returning(&self, columns: &[&str]) -> BuildResult<Self> {
        returning(self.schema, &self.table, &self.stmt, columns).map(|stmt| Self {
            schema: self.schema,
            table: self.table.clone(),
            stmt,
        })
    }
}

fn returning(schema: &Schema, table: &str, stmt: &Stmt, columns: &[&str]) -> BuildResult<Stmt> {
    schema
        .table(table)?
        .ensure_columns(table, columns.iter().copied())?;
    rewrite::with_returning(stmt, &column_idents(columns))
}

/// AND-fold of per-key equalities, refusing anything that is not a key
fn key_filter(schema: &Schema, table: &str, keys: &ValueMap) -> BuildResult<Expr> {
    let table_schema = checked_table(schema, table, keys)?;
    if keys.is_empty() {
        return Err(UnsupportedOperation::EmptyKeySet {
            table: table.to_string(),
        }
        .into());
    }
    if !table_schema.is_key(keys.keys().map(String::as_str)) {
        return Err(SchemaError::NotAKey {
            table: table.to_string(),
            columns: keys.keys().cloned().collect(),
        }
        .into());
    }

    let pairs = comparison_pairs(table, keys)?;
    rewrite::key_conjunction(pairs).ok_or_else(|| {
        UnsupportedOperation::EmptyKeySet {
            table: table.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::super::{value_map, ColumnValue, Statement};
    use super::*;
    use crate::ast::RenderOptions;
    use crate::error::BuildError;
    use crate::schema::fixtures::user_account_schema;

    #[test]
    fn test_update_single_key() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .update(
                "account",
                &value_map([("id", 1.into())]),
                &value_map([("name", "main".into())]),
            )
            .unwrap();
        assert_eq!(
            stmt.to_sql_with(RenderOptions::conventional()),
            "UPDATE account SET name = 'main' WHERE (id) = ('1')"
        );
    }

    #[test]
    fn test_update_alternate_key_conjoined() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .update(
                "user_account",
                &value_map([("user_id", 1.into()), ("account_id", 2.into())]),
                &value_map([("created_at", crate::ast::now().into())]),
            )
            .unwrap();
        assert_eq!(
            stmt.to_sql(),
            "update \"user_account\" set \"created_at\" = now() \
             where (\"user_id\") = ('1') and (\"account_id\") = ('2')"
        );
    }

    #[test]
    fn test_update_skips_absent_sets() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .update(
                "user",
                &value_map([("id", 1.into())]),
                &value_map([("data", "x".into()), ("tags", ColumnValue::Absent)]),
            )
            .unwrap();
        assert!(!stmt.to_sql().contains("tags"));
    }

    #[test]
    fn test_update_rejects_empty_keys_and_sets() {
        let schema = user_account_schema();
        let sql = QueryBuilder::new(&schema);

        let err = sql
            .update("user", &ValueMap::new(), &value_map([("data", "x".into())]))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Unsupported(UnsupportedOperation::EmptyKeySet {
                table: "user".into()
            })
        );

        let err = sql
            .update(
                "user",
                &value_map([("id", 1.into())]),
                &value_map([("data", ColumnValue::Absent)]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Unsupported(UnsupportedOperation::EmptySetList {
                table: "user".into()
            })
        );
    }

    #[test]
    fn test_update_rejects_non_key() {
        let schema = user_account_schema();
        let err = QueryBuilder::new(&schema)
            .update(
                "user_account",
                &value_map([("user_id", 1.into())]),
                &value_map([("account_id", 3.into())]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Schema(SchemaError::NotAKey {
                table: "user_account".into(),
                columns: vec!["user_id".into()]
            })
        );
    }

    #[test]
    fn test_absent_key_value_is_rejected() {
        let schema = user_account_schema();
        let err = QueryBuilder::new(&schema)
            .delete("user", &value_map([("id", ColumnValue::Absent)]))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Unsupported(UnsupportedOperation::AbsentKeyValue { .. })
        ));
    }

    #[test]
    fn test_delete_with_returning() {
        let schema = user_account_schema().with_namespace("public");
        let stmt = QueryBuilder::new(&schema)
            .delete("user", &value_map([("id", 1.into())]))
            .unwrap()
            .returning(&["id", "data"])
            .unwrap();
        assert_eq!(
            stmt.to_sql_with(RenderOptions::conventional()),
            "DELETE FROM public.\"user\" WHERE (id) = ('1') RETURNING id, data"
        );
    }

    #[test]
    fn test_update_returning_is_replaced() {
        let schema = user_account_schema();
        let base = QueryBuilder::new(&schema)
            .update(
                "user",
                &value_map([("id", 1.into())]),
                &value_map([("data", "x".into())]),
            )
            .unwrap();
        let stmt = base.returning(&["id"]).unwrap().returning(&["data"]).unwrap();
        assert!(stmt.to_sql().ends_with("returning \"data\""));
        assert!(!base.to_sql().contains("returning"));
    }
}
