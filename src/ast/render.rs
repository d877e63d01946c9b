//! SQL string rendering
//!
//! This module converts AST nodes to SQL strings. It is the only place
//! in the crate where SQL text is produced.
//!
//! # Architecture
//!
//! - [`Render`] trait: Implemented by AST nodes to define how they render to SQL
//! - [`SqlRenderer`]: The rendering context that handles output buffering and formatting
//! - [`RenderOptions`]: keyword case, identifier quoting policy and pretty-printing
//!
//! # Safety
//!
//! Identifiers are wrapped in double quotes with embedded quotes doubled
//! (PostgreSQL rules). Under [`IdentQuoting::WhenNeeded`] an identifier is
//! left bare only when it is a lower-case word that is not a reserved
//! keyword, so nothing a caller passes can escape its token. String literals
//! are single-quoted with embedded single quotes doubled.

use super::cte::Cte;
use super::expr::*;
use super::rewrite;
use super::stmt::*;
use crate::error::{BuildError, BuildResult};

// =============================================================================
// Render Trait
// =============================================================================

/// Trait for AST nodes that can be rendered to SQL.
pub trait Render {
    /// Render this node to the given SQL renderer
    fn render(&self, renderer: &mut SqlRenderer);
}

impl Render for Stmt {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_stmt(self);
    }
}

impl Render for Expr {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_expr(self);
    }
}

impl Render for Literal {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_literal(self);
    }
}

impl Render for Ident {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.write_ident(self);
    }
}

// =============================================================================
// Options
// =============================================================================

/// Case used for SQL keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordCase {
    #[default]
    Lower,
    Upper,
}

/// When identifiers get wrapped in double quotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentQuoting {
    /// Quote every identifier
    #[default]
    Always,
    /// Leave plain lower-case, non-reserved identifiers bare
    WhenNeeded,
}

/// Renderer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub keyword_case: KeywordCase,
    pub ident_quoting: IdentQuoting,
    pub pretty: bool,
}

impl RenderOptions {
    /// Upper-case keywords and minimal quoting, the style of hand-written SQL
    pub fn conventional() -> Self {
        Self {
            keyword_case: KeywordCase::Upper,
            ident_quoting: IdentQuoting::WhenNeeded,
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Read options from the environment
    ///
    /// - `PASTA_SQL_KEYWORD_CASE`: `lower` (default) or `upper`
    /// - `PASTA_SQL_IDENT_QUOTING`: `always` (default) or `when_needed`
    /// - `PASTA_SQL_PRETTY`: `1`/`true` to pretty-print
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let keyword_case = match lookup("PASTA_SQL_KEYWORD_CASE")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("upper") => KeywordCase::Upper,
            _ => KeywordCase::Lower,
        };
        let ident_quoting = match lookup("PASTA_SQL_IDENT_QUOTING")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("when_needed") | Some("minimal") => IdentQuoting::WhenNeeded,
            _ => IdentQuoting::Always,
        };
        let pretty = matches!(
            lookup("PASTA_SQL_PRETTY").map(|s| s.to_lowercase()).as_deref(),
            Some("1") | Some("true") | Some("yes")
        );
        Self {
            keyword_case,
            ident_quoting,
            pretty,
        }
    }
}

// =============================================================================
// Constants
// =============================================================================

/// Default buffer capacity for simple statements
const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Buffer capacity for WITH chains
const CTE_BUFFER_CAPACITY: usize = 1024;

/// PostgreSQL reserved key words; these always need quoting as identifiers
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "table", "then", "to",
    "trailing", "true", "union", "unique", "user", "using", "variadic", "when", "where",
    "window", "with",
    // Reserved, but allowed as function or type names
    "authorization", "binary", "collation", "concurrently", "cross", "current_schema",
    "freeze", "full", "ilike", "inner", "is", "isnull", "join", "left", "like", "natural",
    "notnull", "outer", "overlaps", "right", "similar", "tablesample", "verbose",
];

/// Whether `name` can appear unquoted and still mean exactly `name`
fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        && !RESERVED_KEYWORDS.contains(&name)
}

/// SQL renderer with optional pretty-printing
pub struct SqlRenderer {
    output: String,
    indent_level: usize,
    options: RenderOptions,
}

impl SqlRenderer {
    /// Create a new renderer with default options
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, options)
    }

    /// Create a new renderer with a specific buffer capacity
    pub fn with_capacity(capacity: usize, options: RenderOptions) -> Self {
        Self {
            output: String::with_capacity(capacity),
            indent_level: 0,
            options,
        }
    }

    /// Estimate appropriate buffer capacity based on statement complexity
    pub fn estimate_capacity(stmt: &Stmt) -> usize {
        match stmt {
            Stmt::With(with) => CTE_BUFFER_CAPACITY * with.bindings.len().max(1),
            _ => DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Render a statement and return the SQL string so far
    pub fn render_stmt(&mut self, stmt: &Stmt) -> &str {
        match stmt {
            Stmt::Select(s) => self.render_select(s),
            Stmt::Insert(s) => self.render_insert(s),
            Stmt::Update(s) => self.render_update(s),
            Stmt::Delete(s) => self.render_delete(s),
            Stmt::With(s) => self.render_with(s),
        }
        &self.output
    }

    /// Take ownership of the rendered SQL string
    pub fn into_sql(self) -> String {
        self.output
    }

    // =========================================================================
    // Statement rendering
    // =========================================================================

    fn render_select(&mut self, stmt: &SelectStmt) {
        self.keyword("select");
        if !stmt.columns.is_empty() {
            self.write(" ");
            self.render_select_columns(&stmt.columns);
        }

        if let Some(from) = &stmt.from {
            self.newline();
            self.keyword("from ");
            self.render_from(from);
        }

        if let Some(where_clause) = &stmt.where_clause {
            self.newline();
            self.keyword("where ");
            self.render_expr(where_clause);
        }
    }

    fn render_insert(&mut self, stmt: &InsertStmt) {
        self.keyword("insert into ");
        self.render_table_name(stmt.schema.as_ref(), &stmt.table);

        if !stmt.columns.is_empty() {
            self.write(" (");
            self.render_ident_list(&stmt.columns);
            self.write(")");
        }

        self.newline();
        match &stmt.values {
            InsertValues::Values(rows) => {
                self.keyword("values ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write("(");
                    self.render_expr_list(row);
                    self.write(")");
                }
            }
            InsertValues::Query(query) => {
                self.render_select(query);
            }
            InsertValues::DefaultValues => {
                self.keyword("default values");
            }
        }

        if let Some(on_conflict) = &stmt.on_conflict {
            self.newline();
            self.render_on_conflict(on_conflict);
        }

        self.render_returning(&stmt.returning);
    }

    fn render_update(&mut self, stmt: &UpdateStmt) {
        self.keyword("update ");
        self.render_table_name(stmt.schema.as_ref(), &stmt.table);

        self.newline();
        self.keyword("set ");
        self.render_assignments(&stmt.sets);

        self.newline();
        self.keyword("where ");
        self.render_expr(&stmt.where_clause);

        self.render_returning(&stmt.returning);
    }

    fn render_delete(&mut self, stmt: &DeleteStmt) {
        self.keyword("delete from ");
        self.render_table_name(stmt.schema.as_ref(), &stmt.table);

        self.newline();
        self.keyword("where ");
        self.render_expr(&stmt.where_clause);

        self.render_returning(&stmt.returning);
    }

    fn render_returning(&mut self, returning: &[SelectColumn]) {
        if !returning.is_empty() {
            self.newline();
            self.keyword("returning ");
            self.render_select_columns(returning);
        }
    }

    // =========================================================================
    // CTE rendering
    // =========================================================================

    fn render_with(&mut self, stmt: &WithStmt) {
        self.keyword("with ");
        for (i, cte) in stmt.bindings.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_cte(cte);
        }
        self.newline();
        self.render_stmt(&stmt.body);
    }

    fn render_cte(&mut self, cte: &Cte) {
        self.write_ident(&cte.alias);
        self.keyword(" as ");
        self.write("(");
        self.indent();
        self.block_break();

        self.render_stmt(&cte.query);

        self.dedent();
        self.block_break();
        self.write(")");
    }

    // =========================================================================
    // FROM clause rendering
    // =========================================================================

    fn render_from(&mut self, from: &FromClause) {
        match from {
            FromClause::Table {
                schema,
                name,
                alias,
            } => {
                self.render_table_name(schema.as_ref(), name);
                if let Some(alias) = alias {
                    self.write(" ");
                    self.write_ident(alias);
                }
            }
            FromClause::CrossJoin { left, right } => {
                self.render_from(left);
                self.keyword(" cross join ");
                self.render_from(right);
            }
        }
    }

    // =========================================================================
    // Expression rendering
    // =========================================================================

    fn render_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column(col) => {
                if let Some(table) = &col.table_alias {
                    self.write_ident(table);
                    self.write(".");
                }
                self.write_ident(&col.column);
            }

            Expr::Literal(lit) => self.render_literal(lit),

            Expr::FunctionCall(call) => self.render_function_call(call),

            Expr::BinaryOp { left, op, right } => {
                self.render_operand(left, *op);
                self.write(" ");
                if op.is_keyword() {
                    self.keyword(op.as_sql());
                } else {
                    self.write(op.as_sql());
                }
                self.write(" ");
                self.render_operand(right, *op);
            }

            Expr::List(items) => {
                self.write("(");
                self.render_expr_list(items);
                self.write(")");
            }
        }
    }

    /// Render one side of a binary operation, parenthesised when it binds
    /// looser than its parent
    fn render_operand(&mut self, operand: &Expr, parent: BinaryOperator) {
        match operand {
            Expr::BinaryOp { op, .. } if op.precedence() < parent.precedence() => {
                self.write("(");
                self.render_expr(operand);
                self.write(")");
            }
            _ => self.render_expr(operand),
        }
    }

    fn render_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Bool(b) => self.keyword(if *b { "true" } else { "false" }),
            Literal::Integer(n) => self.output.push_str(&n.to_string()),
            Literal::String(s) => self.write_literal(s),
            Literal::Default => self.keyword("default"),
        }
    }

    fn render_function_call(&mut self, call: &FunctionCall) {
        // Function names stay bare when they can, `gen_random_uuid()` not `"gen_random_uuid"()`
        if is_plain_ident(call.name.as_str()) {
            self.write(call.name.as_str());
        } else {
            self.write_quoted(call.name.as_str());
        }
        self.write("(");
        self.render_expr_list(&call.args);
        self.write(")");
    }

    fn render_on_conflict(&mut self, on_conflict: &OnConflict) {
        self.keyword("on conflict ");

        if let Some(OnConflictTarget::Columns(cols)) = &on_conflict.target {
            self.write("(");
            self.render_ident_list(cols);
            self.write(") ");
        }

        match &on_conflict.action {
            OnConflictAction::DoNothing => {
                self.keyword("do nothing");
            }
            OnConflictAction::DoUpdate { sets } => {
                self.keyword("do update set ");
                self.render_assignments(sets);
            }
        }
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn render_select_columns(&mut self, columns: &[SelectColumn]) {
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match col {
                SelectColumn::Expr { expr, alias } => {
                    self.render_expr(expr);
                    if let Some(alias) = alias {
                        self.keyword(" as ");
                        self.write_ident(alias);
                    }
                }
                SelectColumn::Star => self.write("*"),
            }
        }
    }

    fn render_assignments(&mut self, sets: &[ColumnAssignment]) {
        for (i, set) in sets.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_ident(&set.column);
            self.write(" = ");
            self.render_expr(&set.value);
        }
    }

    fn render_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(expr);
        }
    }

    fn render_ident_list(&mut self, idents: &[Ident]) {
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_ident(ident);
        }
    }

    fn render_table_name(&mut self, schema: Option<&Ident>, name: &Ident) {
        if let Some(schema) = schema {
            self.write_ident(schema);
            self.write(".");
        }
        self.write_ident(name);
    }

    // =========================================================================
    // Low-level output methods
    // =========================================================================

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn keyword(&mut self, kw: &str) {
        match self.options.keyword_case {
            KeywordCase::Lower => self.output.push_str(kw),
            KeywordCase::Upper => self.output.push_str(&kw.to_ascii_uppercase()),
        }
    }

    fn write_ident(&mut self, ident: &Ident) {
        match self.options.ident_quoting {
            IdentQuoting::WhenNeeded if is_plain_ident(ident.as_str()) => {
                self.output.push_str(ident.as_str())
            }
            _ => self.write_quoted(ident.as_str()),
        }
    }

    fn write_quoted(&mut self, name: &str) {
        self.output.push('"');
        // Escape any double quotes in the identifier by doubling them
        for c in name.chars() {
            if c == '"' {
                self.output.push('"');
            }
            self.output.push(c);
        }
        self.output.push('"');
    }

    fn write_literal(&mut self, s: &str) {
        self.output.push('\'');
        for c in s.chars() {
            if c == '\'' {
                self.output.push('\'');
            }
            self.output.push(c);
        }
        self.output.push('\'');
    }

    fn newline(&mut self) {
        if self.options.pretty {
            self.output.push('\n');
            for _ in 0..self.indent_level {
                self.output.push_str("    ");
            }
        } else {
            self.output.push(' ');
        }
    }

    /// Line break inside parentheses; nothing in compact mode
    fn block_break(&mut self) {
        if self.options.pretty {
            self.newline();
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Shape validation
// =========================================================================

/// Check that a statement has a shape the renderer produces valid SQL for
///
/// Builders never produce a statement that fails this check; it exists for
/// hand-assembled ASTs.
pub fn validate(stmt: &Stmt) -> BuildResult<()> {
    match stmt {
        Stmt::Select(_) => Ok(()),
        Stmt::Insert(insert) => match &insert.values {
            InsertValues::Values(rows) => {
                if rows.is_empty() {
                    return Err(BuildError::render(format!(
                        "insert into {} has no value rows",
                        insert.table
                    )));
                }
                match rows.iter().position(|row| row.len() != insert.columns.len()) {
                    Some(i) => Err(BuildError::render(format!(
                        "insert into {}: row {} has {} values for {} columns",
                        insert.table,
                        i,
                        rows[i].len(),
                        insert.columns.len()
                    ))),
                    None => Ok(()),
                }
            }
            InsertValues::Query(query) if query.columns.len() != insert.columns.len() => {
                Err(BuildError::render(format!(
                    "insert into {}: query selects {} columns for {} targets",
                    insert.table,
                    query.columns.len(),
                    insert.columns.len()
                )))
            }
            InsertValues::Query(_) => Ok(()),
            InsertValues::DefaultValues if !insert.columns.is_empty() => Err(BuildError::render(
                format!("insert into {}: default values with a column list", insert.table),
            )),
            InsertValues::DefaultValues => Ok(()),
        },
        Stmt::Update(update) if update.sets.is_empty() => Err(BuildError::render(format!(
            "update of {} has an empty SET list",
            update.table
        ))),
        Stmt::Update(_) | Stmt::Delete(_) => Ok(()),
        Stmt::With(with) => {
            if with.bindings.is_empty() {
                return Err(BuildError::render("with statement has no bindings"));
            }
            if let Some(alias) = rewrite::duplicate_alias(&with.bindings) {
                return Err(BuildError::render(format!(
                    "with statement binds {} more than once",
                    alias
                )));
            }
            for cte in &with.bindings {
                if matches!(cte.query.as_ref(), Stmt::With(_)) && cte.query.is_data_modifying() {
                    return Err(BuildError::render(format!(
                        "binding {} nests a data-modifying with statement",
                        cte.alias
                    )));
                }
                validate(&cte.query)?;
            }
            validate(&with.body)
        }
    }
}

// =========================================================================
// Convenience functions
// =========================================================================

/// Render a statement to a compact SQL string with default options
pub fn render(stmt: &Stmt) -> String {
    render_with(stmt, RenderOptions::default())
}

/// Render a statement with explicit options
pub fn render_with(stmt: &Stmt, options: RenderOptions) -> String {
    let capacity = SqlRenderer::estimate_capacity(stmt);
    let mut renderer = SqlRenderer::with_capacity(capacity, options);
    renderer.render_stmt(stmt);
    renderer.into_sql()
}

/// Render a statement to a pretty-printed SQL string
pub fn render_pretty(stmt: &Stmt) -> String {
    render_with(stmt, RenderOptions::default().with_pretty(true))
}

/// Validate the statement shape, then render it
pub fn try_render(stmt: &Stmt, options: RenderOptions) -> BuildResult<String> {
    validate(stmt)?;
    Ok(render_with(stmt, options))
}

/// Render just an expression
pub fn render_expr(expr: &Expr) -> String {
    let mut renderer = SqlRenderer::new();
    renderer.render_expr(expr);
    renderer.into_sql()
}
