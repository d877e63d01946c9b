//! SELECT with an equality filter

use super::{checked_table, column_idents, comparison_pairs, QueryBuilder, ValueMap};
use crate::ast::{rewrite, FromClause, SelectStmt, Stmt};
use crate::error::{BuildResult, SchemaError, UnsupportedOperation};
use crate::schema::Schema;

#[derive(Debug, Clone)]
pub struct SelectBuilder<'s> {
    pub(super) schema: &'s Schema,
    pub(super) table: String,
    pub(super) stmt: Stmt,
}

super::impl_statement!(SelectBuilder);

impl<'s> QueryBuilder<'s> {
    /// `select from <table>`: no columns and no filter yet
    pub fn select(&self, table: &str) -> BuildResult<SelectBuilder<'s>> {
        self.schema.table(table)?;
        let stmt = SelectStmt::new()
            .with_from(FromClause::qualified_table(self.schema.namespace_ident(), table));
        Ok(SelectBuilder {
            schema: self.schema,
            table: table.to_string(),
            stmt: Stmt::Select(stmt),
        })
    }
}

impl<'s> SelectBuilder<'s> {
    /// Filter on arbitrary columns: `where (a, b) = ('1', '2')`
    ///
    /// Replaces any previous filter.
    pub fn filter(&self, values: &ValueMap) -> BuildResult<Self> {
        checked_table(self.schema, &self.table, values)?;
        let filter = rewrite::eq_list(comparison_pairs(&self.table, values)?).ok_or_else(|| {
            UnsupportedOperation::EmptyKeySet {
                table: self.table.clone(),
            }
        })?;
        Ok(self.with_stmt(rewrite::with_filter(&self.stmt, filter)?))
    }

    /// Like [`filter`](Self::filter), but the columns must form one of the
    /// table's keys so at most one row matches
    pub fn unique(&self, keys: &ValueMap) -> BuildResult<Self> {
        let table_schema = checked_table(self.schema, &self.table, keys)?;
        if !keys.is_empty() && !table_schema.is_key(keys.keys().map(String::as_str)) {
            return Err(SchemaError::NotAKey {
                table: self.table.clone(),
                columns: keys.keys().cloned().collect(),
            }
            .into());
        }
        self.filter(keys)
    }

    /// Set the projected columns, replacing any previous list
    pub fn returning(&self, columns: &[&str]) -> BuildResult<Self> {
        self.schema
            .table(&self.table)?
            .ensure_columns(&self.table, columns.iter().copied())?;
        Ok(self.with_stmt(rewrite::with_projection(&self.stmt, &column_idents(columns))?))
    }

    fn with_stmt(&self, stmt: Stmt) -> Self {
        Self {
            schema: self.schema,
            table: self.table.clone(),
            stmt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{value_map, Statement};
    use super::*;
    use crate::ast::RenderOptions;
    use crate::error::BuildError;
    use crate::schema::{fixtures::user_account_schema, TableSchema};

    #[test]
    fn test_select_with_namespace() {
        let schema = Schema::default()
            .with_namespace("information_schema")
            .with_table("tables", TableSchema::new(["table_name"], ["table_name"]));
        let sql = QueryBuilder::new(&schema);

        let stmt = sql.select("tables").unwrap();
        assert_eq!(
            stmt.to_sql_with(RenderOptions::conventional()),
            "SELECT FROM information_schema.tables"
        );

        let stmt = stmt.returning(&["table_name"]).unwrap();
        assert_eq!(
            stmt.to_sql_with(RenderOptions::conventional()),
            "SELECT table_name FROM information_schema.tables"
        );
    }

    #[test]
    fn test_filter_renders_row_comparison() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .select("user_account")
            .unwrap()
            .filter(&value_map([("user_id", 1.into()), ("created_at", "today".into())]))
            .unwrap()
            .returning(&["id"])
            .unwrap();
        assert_eq!(
            stmt.to_sql(),
            "select \"id\" from \"user_account\" \
             where (\"user_id\", \"created_at\") = ('1', 'today')"
        );
    }

    #[test]
    fn test_filter_replaces_previous() {
        let schema = user_account_schema();
        let base = QueryBuilder::new(&schema).select("account").unwrap();
        let stmt = base
            .filter(&value_map([("name", "a".into())]))
            .unwrap()
            .filter(&value_map([("name", "b".into())]))
            .unwrap();
        let sql = stmt.to_sql();
        assert!(sql.ends_with("where (\"name\") = ('b')"));
        assert!(!sql.contains("'a'"));
        assert_eq!(base.to_sql(), "select from \"account\"");
    }

    #[test]
    fn test_unique_requires_key() {
        let schema = user_account_schema();
        let select = QueryBuilder::new(&schema).select("user_account").unwrap();

        assert!(select
            .unique(&value_map([("account_id", 2.into()), ("user_id", 1.into())]))
            .is_ok());
        assert!(matches!(
            select.unique(&value_map([("account_id", 2.into())])),
            Err(BuildError::Schema(SchemaError::NotAKey { .. }))
        ));
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        let schema = user_account_schema();
        let select = QueryBuilder::new(&schema).select("account").unwrap();
        assert!(matches!(
            select.filter(&ValueMap::new()),
            Err(BuildError::Unsupported(UnsupportedOperation::EmptyKeySet { .. }))
        ));
    }
}
