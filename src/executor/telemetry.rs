//! Telemetry and logging for SQL execution
//!
//! Events go through `tracing`; the subscriber is the application's
//! business. On top of whatever filter the subscriber applies, how much this
//! module emits is gated by its own log level.
//!
//! # Configuration
//!
//! Set the `PASTA_SQL_LOG_LEVEL` environment variable to one of:
//! - `off` - No logging (default)
//! - `basic` - Log SQL (truncated) and timing only
//! - `detailed` - Log full SQL and plan context
//! - `debug` - Also log the rows that came back
//!
//! # Example
//!
//! ```bash
//! export PASTA_SQL_LOG_LEVEL=detailed
//! ```

use std::time::Instant;

use tracing::{debug, info, warn};

use super::ExecutionPlan;

/// SQL longer than this is truncated below `Detailed`
const BASIC_SQL_LIMIT: usize = 1000;

/// Log level for SQL telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// No logging
    #[default]
    Off = 0,
    /// Basic info: SQL and timing
    Basic = 1,
    /// Detailed: full SQL and plan context
    Detailed = 2,
    /// Debug: everything including result rows
    Debug = 3,
}

impl LogLevel {
    /// Parse a level name; anything unknown means `Off`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "basic" => Self::Basic,
            "detailed" => Self::Detailed,
            "debug" => Self::Debug,
            _ => Self::Off,
        }
    }
}

/// Get current log level from environment
///
/// Checks `PASTA_SQL_LOG_LEVEL` environment variable.
pub fn get_log_level() -> LogLevel {
    std::env::var("PASTA_SQL_LOG_LEVEL")
        .map(|s| LogLevel::parse(&s))
        .unwrap_or(LogLevel::Off)
}

/// Cut `s` to at most `limit` bytes on a char boundary
fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Log an execution plan
pub fn log_plan(plan: &ExecutionPlan) {
    let level = get_log_level();
    if level < LogLevel::Basic {
        return;
    }

    info!(
        description = %plan.description,
        kind = plan.telemetry.statement_kind,
        expects_rows = plan.expects_rows,
        elapsed_ms = plan.telemetry.elapsed_ms() as u64,
        "pasta_sql: execution plan"
    );

    if level >= LogLevel::Detailed {
        if !plan.telemetry.bindings.is_empty() {
            info!(bindings = ?plan.telemetry.bindings, "pasta_sql: with bindings");
        }
        for (key, value) in &plan.telemetry.tags {
            info!("pasta_sql: tag {}: {}", key, value);
        }
    }
}

/// Log SQL execution
pub fn log_sql(sql: &str) {
    let level = get_log_level();
    if level < LogLevel::Basic {
        return;
    }

    let sql_display = if level >= LogLevel::Detailed {
        sql.to_string()
    } else {
        truncate(sql, BASIC_SQL_LIMIT)
    };

    info!("pasta_sql: SQL:\n{}", sql_display);
}

/// Log rows handed back by the executor
pub fn log_rows(rows: &[serde_json::Value]) {
    let level = get_log_level();
    if level < LogLevel::Basic {
        return;
    }

    info!(rows = rows.len(), "pasta_sql: rows returned");
    if level >= LogLevel::Debug {
        for row in rows {
            debug!("pasta_sql: row {}", row);
        }
    }
}

/// Log execution result
pub fn log_result(start: Instant, success: bool) {
    let level = get_log_level();
    if level < LogLevel::Basic {
        return;
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = if success { "completed" } else { "failed" };

    info!(duration_ms, "pasta_sql: execution {}", status);
}

/// Log an error
pub fn log_error(context: &str, error: &str) {
    let level = get_log_level();
    if level < LogLevel::Basic {
        return;
    }

    warn!("pasta_sql: error in {}: {}", context, error);
}

/// A guard that logs execution timing on drop
pub struct ExecutionTimer {
    start: Instant,
    context: String,
    logged: bool,
}

impl ExecutionTimer {
    /// Start a new execution timer
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            context: context.into(),
            logged: false,
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Mark as successful and log
    pub fn success(mut self) {
        self.logged = true;
        log_result(self.start, true);
    }

    /// Mark as failed and log
    pub fn failure(mut self, error: &str) {
        self.logged = true;
        log_error(&self.context, error);
        log_result(self.start, false);
    }
}

impl Drop for ExecutionTimer {
    fn drop(&mut self) {
        // Dropped without an outcome: treat as failure
        if !self.logged {
            log_result(self.start, false);
        }
    }
}
