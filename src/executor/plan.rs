//! Execution plans for built statements
//!
//! A plan is the rendered SQL of one statement plus what the caller needs to
//! run it: whether rows are expected back and some context for the logs.
//! Dependent inserts are already sequenced inside the statement's WITH chain,
//! so one statement is always one plan.

use std::time::Instant;

use crate::ast::{try_render, RenderOptions, Stmt};
use crate::builder::Statement;
use crate::error::BuildResult;

/// A rendered statement ready to hand to a [`SqlExecutor`](super::SqlExecutor)
#[derive(Debug)]
pub struct ExecutionPlan {
    /// SQL text to run
    pub sql: String,
    /// Whether the statement hands rows back (SELECT, or RETURNING)
    pub expects_rows: bool,
    /// Human-readable description of what the statement does
    pub description: String,
    /// Telemetry information for debugging
    pub telemetry: PlanTelemetry,
}

/// Telemetry information attached to an execution plan
#[derive(Debug)]
pub struct PlanTelemetry {
    /// Kind of the statement that finally runs, e.g. `insert`
    pub statement_kind: &'static str,
    /// Aliases bound in the WITH chain, in binding order
    pub bindings: Vec<String>,
    /// When the plan was created
    pub created_at: Instant,
    /// Custom tags for categorization
    pub tags: Vec<(String, String)>,
}

impl PlanTelemetry {
    fn for_stmt(stmt: &Stmt) -> Self {
        let bindings = match stmt {
            Stmt::With(with) => with.aliases().map(|a| a.to_string()).collect(),
            _ => Vec::new(),
        };
        Self {
            statement_kind: stmt.innermost().kind(),
            bindings,
            created_at: Instant::now(),
            tags: Vec::new(),
        }
    }

    /// Get elapsed time since plan creation
    pub fn elapsed_ms(&self) -> u128 {
        self.created_at.elapsed().as_millis()
    }
}

impl ExecutionPlan {
    /// Validate and render a statement
    pub fn new(
        stmt: &Stmt,
        options: RenderOptions,
        description: impl Into<String>,
    ) -> BuildResult<Self> {
        Ok(Self {
            sql: try_render(stmt, options)?,
            expects_rows: stmt.returns_rows(),
            description: description.into(),
            telemetry: PlanTelemetry::for_stmt(stmt),
        })
    }

    /// Plan for a builder's statement, tagged with the builder's table and
    /// rendered with options from the environment
    pub fn from_builder(builder: &impl Statement) -> BuildResult<Self> {
        let stmt = builder.stmt();
        let description = format!("{} on {}", stmt.innermost().kind(), builder.table());
        Ok(Self::new(stmt, RenderOptions::from_env(), description)?.with_tag("table", builder.table()))
    }

    /// Add a tag to the plan's telemetry
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.telemetry.tags.push((key.into(), value.into()));
        self
    }
}
