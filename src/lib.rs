//! Schema-driven SQL statement builder
//!
//! `pasta_sql` builds INSERT, UPDATE, UPSERT, DELETE and SELECT statements for
//! the tables described by a [`schema::Schema`], composes them into WITH
//! chains, and renders the resulting AST to PostgreSQL text.
//!
//! ```rust,ignore
//! use pasta_sql::{builder::*, schema::Schema};
//!
//! let schema = Schema::from_path("schema.json")?;
//! let sql = QueryBuilder::new(&schema);
//!
//! let stmt = sql
//!     .insert("user", &value_map([("id", uuid().into()), ("data", "hello".into())]))?
//!     .associate(&association_map([(
//!         "accounts",
//!         value_map([("name", "main".into())]),
//!     )]))?
//!     .returning(&["user_id", "account_id"])?;
//!
//! println!("{}", stmt.to_sql());
//! ```

pub mod ast;
pub mod builder;
pub mod error;
pub mod executor;
pub mod schema;

pub use error::{BuildError, BuildResult, ExecutionError, SchemaError, UnsupportedOperation};
