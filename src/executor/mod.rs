//! Execution boundary
//!
//! The crate never opens connections. Callers implement [`SqlExecutor`] over
//! whatever driver they use; this module renders a builder into an
//! [`ExecutionPlan`], hands the SQL over, and logs around it.
//!
//! ```text
//! builder ──► ExecutionPlan { sql, expects_rows, .. } ──► SqlExecutor::execute
//! ```
//!
//! A WITH chain runs as one statement, so the whole association expansion
//! commits or fails together without any transaction handling here.

mod plan;
mod telemetry;

pub use plan::*;
pub use telemetry::*;

use crate::builder::Statement;
use crate::error::ExecutionError;

/// Runs SQL text and hands back the result rows as JSON objects
pub trait SqlExecutor {
    type Error: std::fmt::Display;

    fn execute(&mut self, sql: &str) -> Result<Vec<serde_json::Value>, Self::Error>;
}

/// Run a prepared plan
pub fn execute_plan<E: SqlExecutor>(
    executor: &mut E,
    plan: &ExecutionPlan,
) -> Result<Vec<serde_json::Value>, ExecutionError> {
    log_plan(plan);
    log_sql(&plan.sql);

    let timer = ExecutionTimer::new(plan.description.as_str());
    match executor.execute(&plan.sql) {
        Ok(rows) => {
            timer.success();
            log_rows(&rows);
            Ok(rows)
        }
        Err(e) => {
            let message = e.to_string();
            timer.failure(&message);
            Err(ExecutionError::backend(message))
        }
    }
}

/// Render and run a builder's statement
pub fn transaction<E: SqlExecutor>(
    executor: &mut E,
    statement: &impl Statement,
) -> Result<Vec<serde_json::Value>, ExecutionError> {
    let plan = ExecutionPlan::from_builder(statement)?;
    execute_plan(executor, &plan)
}

/// Like [`transaction`], but no rows coming back is an error
pub fn transaction_returning<E: SqlExecutor>(
    executor: &mut E,
    statement: &impl Statement,
) -> Result<Vec<serde_json::Value>, ExecutionError> {
    let plan = ExecutionPlan::from_builder(statement)?;
    let rows = execute_plan(executor, &plan)?;
    if rows.is_empty() {
        log_error(&plan.description, "no rows returned");
        return Err(ExecutionError::NoRows { sql: plan.sql });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{value_map, QueryBuilder};
    use crate::schema::fixtures::user_account_schema;
    use serde_json::json;

    /// Records the SQL it is given and answers with canned rows
    #[derive(Default)]
    struct MockExecutor {
        seen: Vec<String>,
        rows: Vec<serde_json::Value>,
        fail_with: Option<String>,
    }

    impl SqlExecutor for MockExecutor {
        type Error = String;

        fn execute(&mut self, sql: &str) -> Result<Vec<serde_json::Value>, String> {
            self.seen.push(sql.to_string());
            match &self.fail_with {
                Some(message) => Err(message.clone()),
                None => Ok(self.rows.clone()),
            }
        }
    }

    #[test]
    fn test_transaction_passes_rendered_sql() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .insert("account", &value_map([("name", "a".into())]))
            .unwrap();
        let mut executor = MockExecutor::default();

        let rows = transaction(&mut executor, &stmt).unwrap();
        assert!(rows.is_empty());
        assert_eq!(executor.seen, vec![stmt.to_sql()]);
    }

    #[test]
    fn test_transaction_returning_hands_back_rows() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .insert("account", &value_map([("name", "a".into())]))
            .unwrap()
            .returning(&["id"])
            .unwrap();
        let mut executor = MockExecutor {
            rows: vec![json!({ "id": 42 })],
            ..Default::default()
        };

        let rows = transaction_returning(&mut executor, &stmt).unwrap();
        assert_eq!(rows, vec![json!({ "id": 42 })]);
    }

    #[test]
    fn test_transaction_returning_without_rows() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema)
            .delete("account", &value_map([("id", 1.into())]))
            .unwrap()
            .returning(&["id"])
            .unwrap();
        let mut executor = MockExecutor::default();

        match transaction_returning(&mut executor, &stmt) {
            Err(ExecutionError::NoRows { sql }) => assert_eq!(sql, stmt.to_sql()),
            other => panic!("Expected NoRows, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_error_is_wrapped() {
        let schema = user_account_schema();
        let stmt = QueryBuilder::new(&schema).select("account").unwrap();
        let mut executor = MockExecutor {
            fail_with: Some("connection refused".into()),
            ..Default::default()
        };

        let err = transaction(&mut executor, &stmt).unwrap_err();
        assert_eq!(err.to_string(), "executor failed: connection refused");
    }
}
